// src/registry.rs
//! Name → factory lookup for the three plugin kinds.
//!
//! Registries are plain values built during start-up and handed to the
//! engine; nothing here is global. Each kind has its own registry with its own
//! product type, so a strategy name can never resolve to a venue driver.

use crate::connectors::binance::{self, BinanceClient};
use crate::connectors::traits::VenueDriver;
use crate::error::ConfigError;
use crate::notifiers::{self, noop::NoopNotifier, sms::SmsNotifier, Notifier};
use crate::strategies::ema_sma::{self, EmaSma};
use crate::strategies::traits::Strategy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Free-form `key = value` arguments passed to a plugin factory.
pub type PluginArgs = HashMap<String, String>;

pub type Factory<T> = Box<dyn Fn(&PluginArgs) -> Result<T, ConfigError> + Send + Sync>;

/// Case-insensitive argument lookup. Environment-sourced settings arrive
/// lower-cased, so `apiKey` and `apikey` must both match.
pub fn plugin_arg<'a>(args: &'a PluginArgs, key: &str) -> Option<&'a str> {
    args.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

pub struct Registry<T> {
    kind: &'static str,
    factories: HashMap<String, Factory<T>>,
}

impl<T> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            factories: HashMap::new(),
        }
    }

    /// Stores `factory` under `name`. A second registration of the same name
    /// replaces the first.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&PluginArgs) -> Result<T, ConfigError> + Send + Sync + 'static,
    {
        debug!(kind = self.kind, name, "Registered plugin");
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn resolve(&self, name: &str, args: &PluginArgs) -> Result<T, ConfigError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPlugin {
                kind: self.kind,
                name: name.to_string(),
                available: self.names().join(", "),
            })?;
        factory(args)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

pub struct Registries {
    pub strategies: Registry<Box<dyn Strategy>>,
    pub venues: Registry<Arc<dyn VenueDriver>>,
    pub notifiers: Registry<Arc<dyn Notifier>>,
}

impl Registries {
    pub fn empty() -> Self {
        Self {
            strategies: Registry::new("strategy"),
            venues: Registry::new("venue driver"),
            notifiers: Registry::new("notifier"),
        }
    }

    /// Registries pre-loaded with every plugin shipped in this crate.
    pub fn with_builtin() -> Self {
        let mut registries = Self::empty();

        registries.strategies.register(ema_sma::NAME, |args| {
            let mut strategy = EmaSma::default();
            strategy.configure(args)?;
            Ok(Box::new(strategy) as Box<dyn Strategy>)
        });

        registries.venues.register(binance::NAME, |args| {
            Ok(Arc::new(BinanceClient::from_args(args)?) as Arc<dyn VenueDriver>)
        });

        registries.notifiers.register(notifiers::noop::NAME, |_| {
            Ok(Arc::new(NoopNotifier) as Arc<dyn Notifier>)
        });
        registries.notifiers.register(notifiers::sms::NAME, |args| {
            Ok(Arc::new(SmsNotifier::from_args(args)?) as Arc<dyn Notifier>)
        });

        registries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_factory() {
        let mut registry: Registry<String> = Registry::new("greeting");
        registry.register("hello", |args| {
            Ok(format!("hello {}", plugin_arg(args, "who").unwrap_or("world")))
        });

        let mut args = PluginArgs::new();
        args.insert("WHO".into(), "rust".into());
        assert_eq!(registry.resolve("hello", &args).unwrap(), "hello rust");
        assert_eq!(registry.resolve("hello", &PluginArgs::new()).unwrap(), "hello world");
    }

    #[test]
    fn unknown_name_is_not_found() {
        let mut registry: Registry<String> = Registry::new("greeting");
        registry.register("hola", |_| Ok("hola".into()));
        registry.register("hello", |_| Ok("hello".into()));
        let err = registry.resolve("missing", &PluginArgs::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no greeting registered under 'missing' (available: hello, hola)"
        );
        assert!(matches!(
            err,
            ConfigError::UnknownPlugin { kind: "greeting", ref name, .. } if name == "missing"
        ));
    }

    #[test]
    fn last_registration_wins() {
        let mut registry: Registry<u32> = Registry::new("number");
        registry.register("n", |_| Ok(1));
        registry.register("n", |_| Ok(2));
        assert_eq!(registry.resolve("n", &PluginArgs::new()).unwrap(), 2);
        assert_eq!(registry.names(), vec!["n"]);
    }

    #[test]
    fn factory_errors_propagate() {
        let mut registry: Registry<u32> = Registry::new("number");
        registry.register("strict", |args| {
            plugin_arg(args, "value")
                .ok_or_else(|| ConfigError::MissingArgument("value".into()))?
                .parse::<u32>()
                .map_err(|e| ConfigError::invalid("value", e))
        });
        assert!(matches!(
            registry.resolve("strict", &PluginArgs::new()),
            Err(ConfigError::MissingArgument(_))
        ));
    }

    #[test]
    fn builtin_plugins_are_registered() {
        let registries = Registries::with_builtin();
        assert_eq!(registries.strategies.names(), vec![ema_sma::NAME]);
        assert_eq!(registries.venues.names(), vec![binance::NAME]);
        assert_eq!(registries.notifiers.names(), vec!["noop", "sms"]);

        let strategy = registries
            .strategies
            .resolve(ema_sma::NAME, &PluginArgs::new())
            .unwrap();
        assert_eq!(strategy.name(), ema_sma::NAME);
    }
}
