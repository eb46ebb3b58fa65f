use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

use super::{prelude::*, AdminScreen, OrderScreen};
use crate::entries::Role;

const SHARE_PHONE: &str = "☎️ Надати номер телефону";
const RETRY: &str = "🔁 Повторити вхід";

/// Asks for the user's own contact and binds the Telegram account to a known user.
#[derive(Serialize, Deserialize, Clone, Default, Debug, PartialEq)]
pub struct AuthorizationScreen {
    /// Normalized phone from the last accepted contact.
    pub phone_number: Option<String>,
}

impl AuthorizationScreen {
    async fn check(&self, ctx: &mut Ctx<'_>, phone: &str) -> Result<Transition> {
        let Some(user) = ctx.registry.user_by_phone(phone).await? else {
            info!("Unknown phone {} from user {}", phone, ctx.user_id);
            ctx.send(
                Reply::new(format!(
                    "Ви не авторизовані. Для реєстрації зв'яжіться з менеджером: {}",
                    ctx.config.telegram.manager_contact
                ))
                .buttons(vec![vec![Button::new(RETRY)]]),
            )
            .await?;
            return Ok(Transition::Stay);
        };

        ctx.registry.bind_telegram_user(phone, ctx.user_id).await?;
        ctx.session.set_phone(ctx.user_id, phone);
        ctx.say("✅ Авторизовано.").await?;
        info!("User {} authorized as {}", ctx.user_id, phone);

        Ok(Transition::Reset(match user.role {
            Role::Admin => Screen::Admin(AdminScreen),
            Role::Client => Screen::Order(OrderScreen::default()),
        }))
    }
}

#[async_trait]
impl Flow for AuthorizationScreen {
    async fn enter(&self, ctx: &Ctx<'_>) -> Result<()> {
        ctx.send(
            Reply::new("Для авторизації нам потрібен ваш номер телефону.")
                .buttons(vec![vec![Button::contact(SHARE_PHONE)]]),
        )
        .await
    }

    async fn handle(&mut self, ctx: &mut Ctx<'_>, input: &Input) -> Result<Transition> {
        if let Some(contact) = &input.contact {
            if contact.user_id == Some(input.user_id) {
                let phone = normalize_phone(&contact.phone_number);
                self.phone_number = Some(phone.clone());
                return self.check(ctx, &phone).await;
            }
        } else if input.is(RETRY) {
            if let Some(phone) = self.phone_number.clone() {
                return self.check(ctx, &phone).await;
            }
        }

        ctx.send(
            Reply::new("✖ Хибний номер телефону. Просто натисніть кнопку знизу щоб надати номер.")
                .buttons(vec![vec![Button::contact(SHARE_PHONE)]]),
        )
        .await?;
        Ok(Transition::Stay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::testing::{contact, text},
        entries::Role,
        screens::testing::Harness,
    };

    #[tokio::test]
    async fn foreign_contact_is_rejected() {
        let mut h = Harness::new();
        h.open(10, Screen::Authorization(Default::default())).await;

        h.input(contact(10, "+380501112233", Some(99))).await;
        h.input(text(10, "380501112233")).await;

        let replies = h.replies().await;
        assert!(replies[1].text.starts_with("✖ Хибний номер"));
        assert!(replies[2].text.starts_with("✖ Хибний номер"));
        assert_eq!(h.top_name(10), Some("authorization"));
    }

    #[tokio::test]
    async fn unknown_number_can_retry() {
        let mut h = Harness::new();
        h.open(10, Screen::Authorization(Default::default())).await;

        h.input(contact(10, "+380 50 111 22 33", Some(10))).await;
        let texts = h.texts().await;
        assert!(texts[1].ends_with("@manager"));

        h.registry()
            .create_user("380501112233", Role::Client)
            .await
            .unwrap();
        h.say(10, "🔁 Повторити вхід").await;

        assert_eq!(h.top_name(10), Some("order"));
        assert_eq!(h.state.navigator.depth(10), 1);
        assert_eq!(h.state.session.phone(10), Some("380501112233"));
        assert_eq!(
            h.registry()
                .user_by_telegram_id(10)
                .await
                .unwrap()
                .map(|u| u.phone_number),
            Some("380501112233".to_owned())
        );
    }

    #[tokio::test]
    async fn admin_lands_on_menu() {
        let mut h = Harness::new();
        h.registry().ensure_admin("380500000001").await.unwrap();
        h.open(3, Screen::Authorization(Default::default())).await;

        h.input(contact(3, "380500000001", Some(3))).await;

        assert_eq!(h.top_name(3), Some("admin"));
        let texts = h.texts().await;
        assert_eq!(texts[1], "✅ Авторизовано.");
    }
}
