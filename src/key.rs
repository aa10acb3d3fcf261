use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;

type AccessorFn = Arc<dyn Fn() -> String + Send + Sync>;
type MapFn = Arc<dyn Fn(&str) -> String + Send + Sync>;
type JoinFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Source of a feed's target key (the resolved request URL).
///
/// A key source is either a constant, a zero-argument accessor, a
/// `tokio::sync::watch` channel, or a join of two other sources. The engine
/// resolves it at every protocol invocation and staleness check, and listens
/// for changes where the source can produce them:
///
/// - watch-backed (and joined) sources notify the engine, which re-activates
///   when the *resolved* key actually differs;
/// - fixed and accessor sources never notify. An accessor may still resolve
///   to a new value over time, which the staleness check observes, but it
///   cannot trigger a re-activation by itself.
///
/// An empty resolved key means "no request".
#[derive(Clone)]
pub struct KeySource {
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    Fixed(String),
    Accessor(AccessorFn),
    Watched {
        rx: watch::Receiver<String>,
        map: Option<MapFn>,
    },
    Join {
        left: Box<KeySource>,
        right: Box<KeySource>,
        combine: JoinFn,
    },
}

impl KeySource {
    /// A constant key.
    pub fn fixed(key: impl Into<String>) -> Self {
        Self {
            kind: Kind::Fixed(key.into()),
        }
    }

    /// A key re-read from a closure at every resolution.
    pub fn accessor(get: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            kind: Kind::Accessor(Arc::new(get)),
        }
    }

    /// A key backed by a watch channel. Changes on the channel re-activate
    /// the engine; a dropped sender simply stops producing changes.
    pub fn watch(rx: watch::Receiver<String>) -> Self {
        Self {
            kind: Kind::Watched { rx, map: None },
        }
    }

    /// Derives a new key from this one.
    ///
    /// Fixed keys are mapped eagerly; all other sources apply the mapping at
    /// resolution time, so change notifications pass through untouched.
    pub fn map(self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        let f: MapFn = Arc::new(f);
        let kind = match self.kind {
            Kind::Fixed(key) => Kind::Fixed(f(&key)),
            Kind::Accessor(get) => Kind::Accessor(Arc::new(move || f(&get()))),
            Kind::Watched { rx, map } => {
                let map: MapFn = match map {
                    None => f,
                    Some(prev) => Arc::new(move |raw: &str| f(&prev(raw))),
                };
                Kind::Watched { rx, map: Some(map) }
            }
            Kind::Join {
                left,
                right,
                combine,
            } => Kind::Join {
                left,
                right,
                combine: Arc::new(move |a: &str, b: &str| f(&combine(a, b))),
            },
        };
        Self { kind }
    }

    /// Combines two sources into one key. A change in either side counts as
    /// a change of the joined key.
    pub fn join(
        left: impl Into<KeySource>,
        right: impl Into<KeySource>,
        combine: impl Fn(&str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: Kind::Join {
                left: Box::new(left.into()),
                right: Box::new(right.into()),
                combine: Arc::new(combine),
            },
        }
    }

    /// Resolves the current key value.
    pub fn resolve(&self) -> String {
        match &self.kind {
            Kind::Fixed(key) => key.clone(),
            Kind::Accessor(get) => get(),
            Kind::Watched { rx, map } => {
                let raw = rx.borrow().clone();
                match map {
                    Some(map) => map(&raw),
                    None => raw,
                }
            }
            Kind::Join {
                left,
                right,
                combine,
            } => combine(&left.resolve(), &right.resolve()),
        }
    }

    /// Waits until the underlying source signals a change.
    ///
    /// Never resolves for fixed/accessor sources, or once a watch sender is
    /// gone. Callers must compare resolved keys themselves: a notification
    /// does not guarantee the resolved value differs.
    pub(crate) fn changed(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        match &mut self.kind {
            Kind::Fixed(_) | Kind::Accessor(_) => Box::pin(std::future::pending()),
            Kind::Watched { rx, .. } => Box::pin(async move {
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }),
            Kind::Join { left, right, .. } => Box::pin(async move {
                tokio::select! {
                    () = left.changed() => {}
                    () = right.changed() => {}
                }
            }),
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Fixed(key) => f.debug_tuple("KeySource::Fixed").field(key).finish(),
            Kind::Accessor(_) => f.write_str("KeySource::Accessor"),
            Kind::Watched { .. } => f.write_str("KeySource::Watched"),
            Kind::Join { .. } => f.write_str("KeySource::Join"),
        }
    }
}

impl From<&str> for KeySource {
    fn from(key: &str) -> Self {
        Self::fixed(key)
    }
}

impl From<String> for KeySource {
    fn from(key: String) -> Self {
        Self::fixed(key)
    }
}

impl From<watch::Receiver<String>> for KeySource {
    fn from(rx: watch::Receiver<String>) -> Self {
        Self::watch(rx)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::watch;
    use tokio::time::timeout;

    use super::KeySource;

    #[test]
    fn fixed_keys_map_eagerly() {
        let key = KeySource::fixed("btc").map(|id| format!("https://api/coin/{id}"));
        assert_eq!(key.resolve(), "https://api/coin/btc");
    }

    #[test]
    fn accessor_resolves_current_value() {
        let key = KeySource::accessor(|| "eth".to_owned()).map(|id| format!("/coin/{id}"));
        assert_eq!(key.resolve(), "/coin/eth");
    }

    #[tokio::test]
    async fn watched_key_tracks_sender_and_composes_maps() {
        let (tx, rx) = watch::channel("btc".to_owned());
        let key = KeySource::watch(rx)
            .map(|id| id.to_uppercase())
            .map(|id| format!("/coin/{id}"));
        assert_eq!(key.resolve(), "/coin/BTC");

        tx.send("sol".to_owned()).expect("receiver alive");
        assert_eq!(key.resolve(), "/coin/SOL");
    }

    #[test]
    fn join_combines_both_sides() {
        let key = KeySource::join("btc", "24h", |id, period| {
            format!("/coin/{id}/history?timePeriod={period}")
        });
        assert_eq!(key.resolve(), "/coin/btc/history?timePeriod=24h");
    }

    #[tokio::test]
    async fn changed_fires_on_watch_send() {
        let (tx, rx) = watch::channel("a".to_owned());
        let mut key = KeySource::watch(rx);

        tx.send("b".to_owned()).expect("receiver alive");
        timeout(Duration::from_millis(100), key.changed())
            .await
            .expect("change must be observed");
        assert_eq!(key.resolve(), "b");
    }

    #[tokio::test]
    async fn changed_fires_when_either_joined_side_changes() {
        let (_id_tx, id_rx) = watch::channel("btc".to_owned());
        let (period_tx, period_rx) = watch::channel("24h".to_owned());
        let mut key = KeySource::join(
            KeySource::watch(id_rx),
            KeySource::watch(period_rx),
            |id, period| format!("{id}:{period}"),
        );

        period_tx.send("7d".to_owned()).expect("receiver alive");
        timeout(Duration::from_millis(100), key.changed())
            .await
            .expect("change must be observed");
        assert_eq!(key.resolve(), "btc:7d");
    }

    #[tokio::test]
    async fn changed_never_fires_for_fixed_keys() {
        let mut key = KeySource::fixed("constant");
        let result = timeout(Duration::from_millis(50), key.changed()).await;
        assert!(result.is_err());
    }
}
