use tracing_subscriber::prelude::*;

pub(crate) static TRACE_ENV: &str = "DEP_HASH_TRACE";

/// Prints `tracing` events to stderr when `DEP_HASH_TRACE` holds a level
/// name. Safe to call more than once.
pub fn enable_by_env() {
    let is_enabled = std::env::var(TRACE_ENV).map_or(false, |var| {
        matches!(var.as_str(), "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR")
    });
    if !is_enabled {
        return;
    }
    let formatter = Formatter::default();
    let _ = tracing_subscriber::Registry::default()
        .with(formatter)
        .with(tracing_subscriber::EnvFilter::from_env(TRACE_ENV))
        .try_init();
}

#[derive(Default)]
struct Formatter {}

impl<S> tracing_subscriber::Layer<S> for Formatter
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _: tracing_subscriber::layer::Context<'_, S>) {
        let mut data = Data(event.metadata().target());
        event.record(&mut data);
    }
}

struct Data<'a>(&'a str);

impl tracing::field::Visit for Data<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            eprintln!("[{}] {value:?}", self.0);
        } else {
            eprintln!("[{}] {} = {value:?}", self.0, field.name());
        }
    }
}
