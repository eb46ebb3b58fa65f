use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveType {
    Delivery,
    SelfPickup,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderPayment {
    Cash,
    Cashless,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Day,
    Evening,
    Custom,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CarDeliveryTime {
    pub time_of_day: TimeOfDay,
    /// Set only when `time_of_day` is `Custom`.
    pub custom: Option<NaiveTime>,
}

impl CarDeliveryTime {
    pub fn preset(time_of_day: TimeOfDay) -> Self {
        Self {
            time_of_day,
            custom: None,
        }
    }

    pub fn custom(time: NaiveTime) -> Self {
        Self {
            time_of_day: TimeOfDay::Custom,
            custom: Some(time),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum CarTimes {
    General(CarDeliveryTime),
    /// Indexed by car number, starting at zero.
    Individual(Vec<Option<CarDeliveryTime>>),
}

impl CarTimes {
    pub fn individual(cars: u32) -> Self {
        CarTimes::Individual(vec![None; cars as usize])
    }

    pub fn pending_cars(&self) -> Vec<usize> {
        match self {
            CarTimes::General(_) => vec![],
            CarTimes::Individual(times) => times
                .iter()
                .enumerate()
                .filter(|(_, time)| time.is_none())
                .map(|(idx, _)| idx)
                .collect(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pending_cars().is_empty()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Order {
    pub date: NaiveDate,
    pub receive_type: ReceiveType,
    pub mark: String,
    pub cars: u32,
    pub car_times: CarTimes,
    pub payment: OrderPayment,
}
