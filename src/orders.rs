use chrono::{Datelike, Weekday};
use log::info;
use teloxide::types::ChatId;

use crate::{
    entries::{CarDeliveryTime, CarTimes, Client, Order, OrderPayment, ReceiveType, TimeOfDay},
    messenger::Reply,
    screens::Ctx,
    BotError, Result,
};

fn weekday(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "понеділок",
        Weekday::Tue => "вівторок",
        Weekday::Wed => "середа",
        Weekday::Thu => "четвер",
        Weekday::Fri => "пʼятниця",
        Weekday::Sat => "субота",
        Weekday::Sun => "неділя",
    }
}

fn cars(order: &Order) -> String {
    let owner = match (order.receive_type, order.cars) {
        (ReceiveType::Delivery, 1) => "НАША машина",
        (ReceiveType::SelfPickup, 1) => "ЇХНЯ машина",
        (ReceiveType::Delivery, _) => "НАШИХ машин",
        (ReceiveType::SelfPickup, _) => "ЇХ машин",
    };
    format!("{} {}", order.cars, owner)
}

fn time(time: &CarDeliveryTime) -> String {
    match (time.time_of_day, time.custom) {
        (TimeOfDay::Morning, _) => "Ранок".to_owned(),
        (TimeOfDay::Day, _) => "Обід".to_owned(),
        (TimeOfDay::Evening, _) => "Вечір".to_owned(),
        (TimeOfDay::Custom, Some(t)) => t.format("%H:%M").to_string(),
        (TimeOfDay::Custom, None) => "—".to_owned(),
    }
}

/// Renders an order the way staff read it in the group chat.
pub fn format_order(order: &Order, client: &Client) -> String {
    let mut lines = vec![
        format!(
            "Дата: {} ({})",
            order.date.format("%d.%m.%Y"),
            weekday(order.date.weekday())
        ),
        format!("Замовник: {}", client.name),
        format!("Адреса: {}", client.address),
        format!("Авто: {}", cars(order)),
    ];

    if let CarTimes::General(general) = &order.car_times {
        lines.push(format!("Загальний час автівок: {}", time(general)));
    }

    lines.push(format!("Цемент: {}", order.mark));
    lines.push(format!(
        "Форма оплати: {}",
        match order.payment {
            OrderPayment::Cash => "Готівка",
            OrderPayment::Cashless => "Безготівкова",
        }
    ));

    if let CarTimes::Individual(times) = &order.car_times {
        lines.push(String::new());
        lines.extend(times.iter().enumerate().map(|(idx, t)| {
            format!(
                "Авто №{}: {}",
                idx + 1,
                t.as_ref().map(time).unwrap_or_else(|| "—".to_owned())
            )
        }));
    }

    lines.join("\n")
}

/// Group chosen with `/notify`, falling back to the configured one.
pub fn staff_chat(ctx: &Ctx<'_>) -> Option<ChatId> {
    ctx.session
        .group_id
        .or(ctx.config.orders.group_id)
        .map(ChatId)
}

pub async fn send_order(ctx: &Ctx<'_>, order: &Order) -> Result<()> {
    let chat_id = staff_chat(ctx)
        .ok_or_else(|| BotError::Delivery("staff group is not set".to_owned()))?;

    let phone = ctx
        .session
        .phone(ctx.user_id)
        .ok_or_else(|| BotError::Delivery(format!("user {} is not authorized", ctx.user_id)))?;
    let client = ctx
        .registry
        .client(phone)
        .await?
        .ok_or_else(|| BotError::Delivery(format!("client {} not found", phone)))?;

    ctx.messenger
        .send(chat_id, Reply::new(format_order(order, &client)))
        .await?;

    info!("Order of {} sent to {}", client.phone_number, chat_id.0);
    Ok(())
}
