use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

/// Пул имён каналов. Каждое имя хранится один раз, все сообщения и
/// подписки на канал ссылаются на один и тот же `Arc<str>`.
static CHANNELS: Lazy<DashMap<Box<str>, Arc<str>>> = Lazy::new(DashMap::new);

/// Возвращает interned `Arc<str>` для имени канала.
///
/// Вставка идёт через `entry`, так что два потока, впервые встретившие
/// одно имя, получат один и тот же `Arc`.
#[inline]
pub(crate) fn intern_channel<S: AsRef<str>>(chan: S) -> Arc<str> {
    let name = chan.as_ref();
    if let Some(existing) = CHANNELS.get(name) {
        return existing.clone();
    }
    CHANNELS
        .entry(Box::from(name))
        .or_insert_with(|| Arc::from(name))
        .clone()
}

#[cfg(test)]
pub(crate) fn is_interned(name: &str) -> bool {
    CHANNELS.contains_key(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_same_arc_for_same_name() {
        let a1 = intern_channel("chat");
        let a2 = intern_channel(String::from("chat"));

        assert_eq!(&*a1, "chat");
        assert!(Arc::ptr_eq(&a1, &a2));
    }

    #[test]
    fn intern_distinguishes_names() {
        let a = intern_channel("chat.eu");
        let b = intern_channel("chat.us");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    /// Конкурентные вызовы для одного имени должны сойтись к одному Arc.
    #[test]
    fn intern_concurrent_first_use() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| intern_channel("intern.race")))
            .collect();
        let arcs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for arc in &arcs[1..] {
            assert!(Arc::ptr_eq(&arcs[0], arc));
        }
    }
}
