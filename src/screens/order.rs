use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::prelude::*;
use crate::{
    entries::{
        CarDeliveryTime, CarTimes, Client, Order, OrderPayment, ReceiveType, TimeOfDay,
    },
    orders,
};

const DELIVERY: &str = "🚚 Доставка";
const SELF_PICKUP: &str = "🏗 Самовивіз";

const ONE_TIME: &str = "🕒 Один час для всіх авто";
const INDIVIDUAL: &str = "⬅ Встановити індивідуально";

const MORNING: &str = "🌅 Ранок";
const DAY: &str = "🌇 Обід";
const EVENING: &str = "🌃 Вечір";
const CUSTOM: &str = "🕘 Власний час";

const CASH: &str = "💵 Готівка";
const CASHLESS: &str = "🏦 Безготівка";

const EDIT: &str = "✍️ Редагувати";
const DONE: &str = "✅ Готово";
const NEW_ORDER: &str = "➕ Нове замовлення";

const EDIT_OPTIONS: [(&str, OrderStep); 5] = [
    ("📆 Змінити дату", OrderStep::SelectDate),
    ("🤲 Змінити спосіб отримання", OrderStep::SelectReceiveType),
    ("🔖 Змінити марку цементу", OrderStep::SelectCementMark),
    (
        "🚚 Змінити кількість автомобілів і час доставки",
        OrderStep::EnterCarsCount,
    ),
    ("💸 Змінити форму оплати", OrderStep::SelectPaymentType),
];

const CUSTOM_TIME_NOTICE: &str = "❗ Ми намагатимемося доставити цемент у вказаний вами час, \
    однак точна доставка не гарантується, оскільки вона залежить від кількості замовлень на цей період \
    та поточної завантаженості водіїв.";

pub const MAX_CARS: u32 = 30;

#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum OrderStep {
    #[default]
    SelectDate,
    SelectReceiveType,
    SelectCementMark,
    EnterCarsCount,
    SelectCarDeliveryType,
    SelectGeneralTime,
    EnterGeneralCustomTime,
    SelectCar,
    SelectIndividualTime,
    EnterIndividualCustomTime,
    SelectPaymentType,
    Summary,
    SelectEdit,
    Finish,
}

#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct OrderForm {
    pub date: Option<NaiveDate>,
    pub receive_type: Option<ReceiveType>,
    pub mark: Option<String>,
    pub cars: Option<u32>,
    pub car_times: Option<CarTimes>,
    /// Car whose time is being entered in the per-car mode.
    pub current_car: Option<usize>,
    pub payment: Option<OrderPayment>,
}

impl OrderForm {
    pub fn to_order(&self) -> Option<Order> {
        let car_times = self.car_times.clone()?;
        if !car_times.is_complete() {
            return None;
        }

        Some(Order {
            date: self.date?,
            receive_type: self.receive_type?,
            mark: self.mark.clone()?,
            cars: self.cars?,
            car_times,
            payment: self.payment?,
        })
    }
}

/// The client's order wizard.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct OrderScreen {
    pub step: OrderStep,
    pub form: OrderForm,
    /// Set once the client opened the edit menu. Finished steps then return to it.
    pub editing: bool,
}

/// First selectable day: today, or tomorrow once the cutoff hour has passed.
pub fn first_day(now: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    let today = now.date();
    if now.hour() >= cutoff_hour {
        today + Duration::days(1)
    } else {
        today
    }
}

pub fn date_options(now: NaiveDateTime, cutoff_hour: u32, days: u32) -> Vec<NaiveDate> {
    let first = first_day(now, cutoff_hour);
    (0..days as i64).map(|i| first + Duration::days(i)).collect()
}

/// Parses `dd.MM` and picks the matching date among the offered `options`.
pub fn parse_date(text: &str, options: &[NaiveDate]) -> Option<NaiveDate> {
    let (day, month) = text.trim().split_once('.')?;
    let (day, month) = (day.parse::<u32>().ok()?, month.parse::<u32>().ok()?);

    options
        .iter()
        .copied()
        .find(|d| d.day() == day && d.month() == month)
}

pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H.%M"))
        .ok()
}

fn time_of_day(text: Option<&str>) -> Option<TimeOfDay> {
    match text? {
        MORNING => Some(TimeOfDay::Morning),
        DAY => Some(TimeOfDay::Day),
        EVENING => Some(TimeOfDay::Evening),
        CUSTOM => Some(TimeOfDay::Custom),
        _ => None,
    }
}

fn time_label(time: &CarDeliveryTime) -> String {
    match (time.time_of_day, time.custom) {
        (TimeOfDay::Morning, _) => MORNING.to_owned(),
        (TimeOfDay::Day, _) => DAY.to_owned(),
        (TimeOfDay::Evening, _) => EVENING.to_owned(),
        (TimeOfDay::Custom, Some(t)) => t.format("%H:%M").to_string(),
        (TimeOfDay::Custom, None) => CUSTOM.to_owned(),
    }
}

fn car_label(idx: usize) -> String {
    format!("🚚 Авто №{}", idx + 1)
}

fn parse_car(text: Option<&str>) -> Option<usize> {
    let number: usize = text?.strip_prefix("🚚 Авто №")?.parse().ok()?;
    number.checked_sub(1)
}

fn time_keyboard() -> Vec<Vec<Button>> {
    vec![
        vec![Button::new(MORNING), Button::new(DAY), Button::new(EVENING)],
        vec![Button::new(CUSTOM)],
    ]
}

/// What the client sees before confirming.
pub fn summary(order: &OrderForm, client: Option<&Client>) -> String {
    let mut lines = vec![
        format!(
            "Дата: {}",
            order
                .date
                .map(|d| d.format("%d.%m.%Y").to_string())
                .unwrap_or_default()
        ),
        format!("Замовник: {}", client.map(|c| c.name.as_str()).unwrap_or("—")),
        format!("Адреса: {}", client.map(|c| c.address.as_str()).unwrap_or("—")),
        format!(
            "Спосіб отримання: {}",
            match order.receive_type {
                Some(ReceiveType::Delivery) => DELIVERY,
                Some(ReceiveType::SelfPickup) => SELF_PICKUP,
                None => "—",
            }
        ),
        format!(
            "Форма оплати: {}",
            match order.payment {
                Some(OrderPayment::Cash) => CASH,
                Some(OrderPayment::Cashless) => CASHLESS,
                None => "—",
            }
        ),
        format!("Марка цементу: {}", order.mark.as_deref().unwrap_or("—")),
        format!("Кількість автівок: {}", order.cars.unwrap_or_default()),
    ];

    match &order.car_times {
        Some(CarTimes::General(time)) => {
            lines.push(format!("Загальний час автівок: {}", time_label(time)))
        }
        Some(CarTimes::Individual(times)) => {
            lines.push(String::new());
            for (idx, time) in times.iter().enumerate() {
                lines.push(format!(
                    "Авто №{}: {}",
                    idx + 1,
                    time.as_ref().map(time_label).unwrap_or_default()
                ));
            }
        }
        None => {}
    }

    lines.join("\n")
}

impl OrderScreen {
    fn previous_step(&self) -> OrderStep {
        use OrderStep::*;

        if self.editing {
            return SelectEdit;
        }

        match self.step {
            SelectReceiveType => SelectDate,
            SelectCementMark => SelectReceiveType,
            EnterCarsCount => SelectCementMark,
            SelectCarDeliveryType
            | SelectGeneralTime
            | EnterGeneralCustomTime
            | SelectCar
            | SelectIndividualTime
            | EnterIndividualCustomTime
            | SelectPaymentType => EnterCarsCount,
            Summary => SelectPaymentType,
            step => step,
        }
    }

    /// First step whose answer is missing, if any.
    fn missing_step(&self) -> Option<OrderStep> {
        let form = &self.form;

        if form.date.is_none() {
            Some(OrderStep::SelectDate)
        } else if form.receive_type.is_none() {
            Some(OrderStep::SelectReceiveType)
        } else if form.mark.is_none() {
            Some(OrderStep::SelectCementMark)
        } else if !form.car_times.as_ref().map_or(false, CarTimes::is_complete) {
            Some(OrderStep::EnterCarsCount)
        } else if form.payment.is_none() {
            Some(OrderStep::SelectPaymentType)
        } else {
            None
        }
    }

    fn has_previous_step(&self) -> bool {
        match self.step {
            OrderStep::SelectEdit | OrderStep::Finish => false,
            OrderStep::SelectDate => self.editing,
            _ => true,
        }
    }

    async fn goto(&mut self, ctx: &Ctx<'_>, step: OrderStep) -> Result<Transition> {
        self.step = step;
        self.enter(ctx).await?;
        Ok(Transition::Stay)
    }

    /// Moves to `step`, or back to the edit menu while editing.
    async fn advance(&mut self, ctx: &Ctx<'_>, step: OrderStep) -> Result<Transition> {
        let step = if self.editing {
            OrderStep::SelectEdit
        } else {
            step
        };
        self.goto(ctx, step).await
    }

    async fn reject(&self, ctx: &Ctx<'_>, text: &str) -> Result<Transition> {
        ctx.say(text).await?;
        Ok(Transition::Stay)
    }

    async fn finish_cars(&mut self, ctx: &Ctx<'_>) -> Result<Transition> {
        self.form.current_car = None;

        match &self.form.car_times {
            Some(times) if times.is_complete() => {
                self.advance(ctx, OrderStep::SelectPaymentType).await
            }
            _ => self.goto(ctx, OrderStep::SelectCar).await,
        }
    }

    fn set_car_time(&mut self, time: CarDeliveryTime) {
        if let (Some(CarTimes::Individual(times)), Some(idx)) =
            (&mut self.form.car_times, self.form.current_car)
        {
            if let Some(slot) = times.get_mut(idx) {
                *slot = Some(time);
            }
        }
    }

    async fn client(&self, ctx: &Ctx<'_>) -> Result<Option<Client>> {
        match ctx.session.phone(ctx.user_id) {
            Some(phone) => Ok(ctx.registry.client(phone).await?),
            None => Ok(None),
        }
    }

    async fn submit(&mut self, ctx: &Ctx<'_>) -> Result<Transition> {
        let Some(order) = self.form.to_order() else {
            let step = self.missing_step().unwrap_or(OrderStep::SelectDate);
            return self.goto(ctx, step).await;
        };

        match orders::send_order(ctx, &order).await {
            Ok(()) => {
                info!("Order from user {} sent", ctx.user_id);
                self.goto(ctx, OrderStep::Finish).await
            }
            Err(e) => {
                error!("Failed to send order from user {}: {}", ctx.user_id, e);
                self.reject(
                    ctx,
                    "✖️ Не вдалося передати замовлення. Спробуйте пізніше або зверніться до менеджера.",
                )
                .await
            }
        }
    }

    async fn render(&self, ctx: &Ctx<'_>) -> Result<Reply> {
        let config = &ctx.config.orders;

        let (text, keyboard) = match self.step {
            OrderStep::SelectDate => {
                let now = Local::now().naive_local();
                let dates = date_options(now, config.cutoff_hour, config.days_ahead);
                (
                    "Оберіть дату:".to_owned(),
                    button_column(dates.iter().map(|d| d.format("%d.%m").to_string())),
                )
            }
            OrderStep::SelectReceiveType => (
                "Оберіть спосіб доставки:".to_owned(),
                button_rows([DELIVERY, SELF_PICKUP], 2),
            ),
            OrderStep::SelectCementMark => (
                "Оберіть марку цементу:".to_owned(),
                button_rows(ctx.registry.marks().await?, 2),
            ),
            OrderStep::EnterCarsCount => (
                "Введіть кількість авто:".to_owned(),
                button_rows((1..=5).map(|i| i.to_string()), 5),
            ),
            OrderStep::SelectCarDeliveryType => (
                "Оберіть час:".to_owned(),
                button_column([ONE_TIME, INDIVIDUAL]),
            ),
            OrderStep::SelectGeneralTime => ("Оберіть час:".to_owned(), time_keyboard()),
            OrderStep::SelectIndividualTime => (
                format!(
                    "Оберіть час для {}:",
                    car_label(self.form.current_car.unwrap_or_default())
                ),
                time_keyboard(),
            ),
            OrderStep::EnterGeneralCustomTime | OrderStep::EnterIndividualCustomTime => {
                ctx.send(Reply::new(CUSTOM_TIME_NOTICE).remove_keyboard())
                    .await?;
                ("Введіть час (ГГ:ХХ):".to_owned(), vec![])
            }
            OrderStep::SelectCar => {
                let pending = self
                    .form
                    .car_times
                    .as_ref()
                    .map(CarTimes::pending_cars)
                    .unwrap_or_default();
                (
                    "Оберіть авто:".to_owned(),
                    button_column(pending.into_iter().map(car_label)),
                )
            }
            OrderStep::SelectPaymentType => (
                "Оберіть варіант оплати:".to_owned(),
                button_rows([CASH, CASHLESS], 2),
            ),
            OrderStep::Summary => (
                summary(&self.form, self.client(ctx).await?.as_ref()),
                button_column([EDIT, DONE]),
            ),
            OrderStep::SelectEdit => {
                let mut keyboard = button_column(EDIT_OPTIONS.iter().map(|(label, _)| *label));
                keyboard.push(vec![Button::new(BACK)]);
                ("Оберіть зміну:".to_owned(), keyboard)
            }
            OrderStep::Finish => (
                "✅ Ваше замовлення в обробці.".to_owned(),
                button_column([NEW_ORDER]),
            ),
        };

        let mut keyboard = keyboard;
        if self.has_previous_step() {
            keyboard.push(vec![Button::new(PREVIOUS_STEP)]);
        }

        Ok(Reply::new(text).buttons(keyboard))
    }
}

#[async_trait]
impl Flow for OrderScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        let reply = self.render(ctx).await?;
        ctx.send(reply).await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        use OrderStep::*;

        if self.has_previous_step() && input.is(PREVIOUS_STEP) {
            let step = self.previous_step();
            return self.goto(ctx, step).await;
        }

        let text = input.text();

        match self.step {
            SelectDate => {
                let config = &ctx.config.orders;
                let options =
                    date_options(Local::now().naive_local(), config.cutoff_hour, config.days_ahead);
                match text.and_then(|t| parse_date(t, &options)) {
                    Some(date) => {
                        self.form.date = Some(date);
                        self.advance(ctx, SelectReceiveType).await
                    }
                    None => self.reject(ctx, "✖️ Хибна дата.").await,
                }
            }
            SelectReceiveType => {
                self.form.receive_type = match text {
                    Some(DELIVERY) => Some(ReceiveType::Delivery),
                    Some(SELF_PICKUP) => Some(ReceiveType::SelfPickup),
                    _ => return self.reject(ctx, NO_SUCH_OPTION).await,
                };
                self.advance(ctx, SelectCementMark).await
            }
            SelectCementMark => {
                let marks = ctx.registry.marks().await?;
                match text.filter(|t| marks.iter().any(|m| m.as_str() == *t)) {
                    Some(mark) => {
                        self.form.mark = Some(mark.to_owned());
                        self.advance(ctx, EnterCarsCount).await
                    }
                    None => self.reject(ctx, NO_SUCH_OPTION).await,
                }
            }
            EnterCarsCount => {
                let cars = text
                    .and_then(|t| t.trim().parse::<u32>().ok())
                    .filter(|n| (1..=MAX_CARS).contains(n));
                let Some(cars) = cars else {
                    return self.reject(ctx, "✖️ Неправильне значення.").await;
                };

                self.form.cars = Some(cars);
                self.form.car_times = None;
                self.form.current_car = None;

                if cars == 1 {
                    self.goto(ctx, SelectGeneralTime).await
                } else {
                    self.goto(ctx, SelectCarDeliveryType).await
                }
            }
            SelectCarDeliveryType => match text {
                Some(ONE_TIME) => self.goto(ctx, SelectGeneralTime).await,
                Some(INDIVIDUAL) => {
                    self.form.car_times = Some(CarTimes::individual(self.form.cars.unwrap_or(1)));
                    self.goto(ctx, SelectCar).await
                }
                _ => self.reject(ctx, NO_SUCH_OPTION).await,
            },
            SelectGeneralTime => match time_of_day(text) {
                Some(TimeOfDay::Custom) => self.goto(ctx, EnterGeneralCustomTime).await,
                Some(preset) => {
                    self.form.car_times = Some(CarTimes::General(CarDeliveryTime::preset(preset)));
                    self.advance(ctx, SelectPaymentType).await
                }
                None => self.reject(ctx, NO_SUCH_OPTION).await,
            },
            EnterGeneralCustomTime => match text.and_then(parse_time) {
                Some(time) => {
                    self.form.car_times = Some(CarTimes::General(CarDeliveryTime::custom(time)));
                    self.advance(ctx, SelectPaymentType).await
                }
                None => self.reject(ctx, "✖️ Неправильний формат часу.").await,
            },
            SelectCar => {
                let pending = self
                    .form
                    .car_times
                    .as_ref()
                    .map(CarTimes::pending_cars)
                    .unwrap_or_default();

                match parse_car(text).filter(|idx| pending.contains(idx)) {
                    Some(idx) => {
                        self.form.current_car = Some(idx);
                        self.goto(ctx, SelectIndividualTime).await
                    }
                    None => self.reject(ctx, NO_SUCH_OPTION).await,
                }
            }
            SelectIndividualTime => match time_of_day(text) {
                Some(TimeOfDay::Custom) => self.goto(ctx, EnterIndividualCustomTime).await,
                Some(preset) => {
                    self.set_car_time(CarDeliveryTime::preset(preset));
                    self.finish_cars(ctx).await
                }
                None => self.reject(ctx, NO_SUCH_OPTION).await,
            },
            EnterIndividualCustomTime => match text.and_then(parse_time) {
                Some(time) => {
                    self.set_car_time(CarDeliveryTime::custom(time));
                    self.finish_cars(ctx).await
                }
                None => self.reject(ctx, "✖️ Неправильний формат часу.").await,
            },
            SelectPaymentType => {
                self.form.payment = match text {
                    Some(CASH) => Some(OrderPayment::Cash),
                    Some(CASHLESS) => Some(OrderPayment::Cashless),
                    _ => return self.reject(ctx, "✖️ Неправильний вибір.").await,
                };
                self.advance(ctx, Summary).await
            }
            Summary => match text {
                Some(DONE) => self.submit(ctx).await,
                Some(EDIT) => {
                    self.editing = true;
                    self.goto(ctx, SelectEdit).await
                }
                _ => self.reject(ctx, NO_SUCH_OPTION).await,
            },
            SelectEdit => {
                if input.is(BACK) {
                    let step = self.missing_step().unwrap_or(Summary);
                    return self.goto(ctx, step).await;
                }

                match EDIT_OPTIONS.iter().find(|(label, _)| text == Some(*label)) {
                    Some((_, step)) => self.goto(ctx, *step).await,
                    None => self.reject(ctx, NO_SUCH_OPTION).await,
                }
            }
            Finish => {
                if input.is(NEW_ORDER) {
                    *self = OrderScreen::default();
                }
                self.enter(ctx).await?;
                Ok(Transition::Stay)
            }
        }
    }
}
