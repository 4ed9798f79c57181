use std::sync::Arc;

use bytes::Bytes;

use super::intern_channel;

/// Сообщение, доставляемое брокером подписчику.
///
/// Канал хранится как interned `Arc<str>`, payload — как `Bytes`, поэтому
/// клонирование при fan-out не копирует данные.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: Arc<str>,
    pub payload: Bytes,
}

impl Message {
    pub fn new(
        channel: impl AsRef<str>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            channel: intern_channel(channel),
            payload: payload.into(),
        }
    }

    /// Пытается интерпретировать payload как UTF-8 текст без копирования.
    pub fn payload_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет создание сообщения с &str и статическими байтами
    #[test]
    fn test_message_creation_with_str_and_bytes() {
        let msg = Message::new("news", Bytes::from_static(b"hello world"));

        assert_eq!(&*msg.channel, "news");
        assert_eq!(msg.payload, Bytes::from_static(b"hello world"));
    }

    /// Тест проверяет создание сообщения с String и Vec<u8>
    #[test]
    fn test_message_creation_with_string_and_vec() {
        let msg = Message::new(String::from("updates"), vec![1u8, 2, 3]);

        assert_eq!(&*msg.channel, "updates");
        assert_eq!(msg.payload.as_ref(), &[1, 2, 3]);
    }

    /// Тест проверяет, что два сообщения в один канал делят один Arc<str>
    #[test]
    fn test_messages_share_interned_channel() {
        let a = Message::new("chat", "a");
        let b = Message::new("chat", "b");

        assert!(Arc::ptr_eq(&a.channel, &b.channel));
    }

    /// Тест проверяет, что UTF-8 payload читается как строка
    #[test]
    fn test_payload_str_valid_utf8() {
        let msg = Message::new("chat", "Привет");
        assert_eq!(msg.payload_str().unwrap(), "Привет");
    }

    /// Тест проверяет, что бинарный payload не проходит как строка
    #[test]
    fn test_payload_str_rejects_binary() {
        let msg = Message::new("bin", vec![0u8, 255, 128]);
        assert!(msg.payload_str().is_err());
    }
}
