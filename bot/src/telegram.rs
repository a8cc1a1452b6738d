use anyhow::Result;
use async_trait::async_trait;
use conversation::{Controller, MenuAction, Reply};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use webhook::{NotificationSink, PaymentNotification};

pub fn menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(
        MenuAction::ALL
            .iter()
            .map(|a| vec![InlineKeyboardButton::callback(a.label(), a.callback_data())]),
    )
}

async fn send(bot: &Bot, chat_id: ChatId, reply: Reply) -> ResponseResult<()> {
    let request = bot.send_message(chat_id, reply.text);
    if reply.show_menu {
        request.reply_markup(menu_keyboard()).await?;
    } else {
        request.await?;
    }
    Ok(())
}

pub async fn on_message(bot: Bot, msg: Message, controller: Arc<Controller>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = msg
        .from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .unwrap_or(msg.chat.id.0);

    let reply = controller.handle_text(user_id, text).await;
    send(&bot, msg.chat.id, reply).await
}

pub async fn on_callback(
    bot: Bot,
    q: CallbackQuery,
    controller: Arc<Controller>,
) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(action) = q.data.as_deref().and_then(MenuAction::parse) else {
        tracing::debug!(data = ?q.data, "ignoring unknown callback");
        return Ok(());
    };
    let Ok(user_id) = i64::try_from(q.from.id.0) else {
        return Ok(());
    };
    let chat_id = q
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    let reply = controller.select(user_id, action).await;
    send(&bot, chat_id, reply).await
}

/// Forwards accepted payment notifications to a merchant chat.
pub struct ChatNotifier {
    pub bot: Bot,
    pub chat_id: ChatId,
    pub currency_label: String,
    pub display_prefix: String,
}

#[async_trait]
impl NotificationSink for ChatNotifier {
    async fn deliver(&self, notification: &PaymentNotification) -> Result<()> {
        let text = notification.summary(&self.currency_label, &self.display_prefix);
        // Best-effort: the audit log is the record of the notification.
        if let Err(e) = self.bot.send_message(self.chat_id, text).await {
            tracing::warn!(
                chat_id = self.chat_id.0,
                error = %e,
                "Could not forward payment notification"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_has_one_row_per_action() {
        let keyboard = menu_keyboard();
        assert_eq!(keyboard.inline_keyboard.len(), MenuAction::ALL.len());
        assert!(keyboard.inline_keyboard.iter().all(|row| row.len() == 1));
    }
}
