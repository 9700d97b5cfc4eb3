use crate::config::{FileSettings, HandlerConfig, HandlerKind, LoggingConfig};
use crate::context::ContextInjector;
use crate::error::{ConfigError, InitError};
use crate::file::RotatingFileHandler;
use crate::filter::{RecordFilter, SourceLevelFilter};
use crate::format::RecordFormatter;
use crate::handler::{ConsoleHandler, HandlerSlot, QueuedHandler, RecordHandler};
use crate::layer::PipelineLayer;
use crate::pipeline::Pipeline;
use crate::queue::RecordQueue;
use crate::registry::HandlerRegistry;
use crate::severity::Severity;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Everything [`build_pipeline`] produces.
///
/// **Fields**
/// - `pipeline`: handler slots in configuration order.
/// - `min_severity`: the configured `level`, used as the layer minimum.
/// - `context`: the metadata-mode [`ContextInjector`] shared by every
///   handler; update it to change the context of subsequent records.
/// - `queue`: the queue behind every `queued` handler. Poll it with
///   [`RecordQueue::try_dequeue`] or hand it to
///   [`spawn_drain`](crate::drain::spawn_drain).
pub struct BuiltPipeline {
    pub pipeline: Pipeline,
    pub min_severity: Severity,
    pub context: Arc<ContextInjector>,
    pub queue: RecordQueue,
}

/// Build the handler pipeline described by `config` without installing it.
///
/// **Parameters**
/// - `config`: parsed [`LoggingConfig`].
/// - `registry`: factories for `custom` handler entries.
/// - `queue`: the queue every `queued` handler pushes into.
///
/// Every handler gets the same two filters, in order: a
/// [`SourceLevelFilter`] built from `config.filters`, then the shared
/// metadata-mode [`ContextInjector`]. When `config.handlers` is empty a
/// single console handler is used.
pub fn build_pipeline(
    config: &LoggingConfig,
    registry: &HandlerRegistry,
    queue: RecordQueue,
) -> Result<BuiltPipeline, ConfigError> {
    let min_severity: Severity = config.level.parse()?;
    let source_filter: Arc<dyn RecordFilter> =
        Arc::new(SourceLevelFilter::new(config.filters.iter().map(|(k, v)| (k, v.clone())))?);
    let context = Arc::new(ContextInjector::with_metadata(Vec::<(String, String)>::new()));
    let context_filter: Arc<dyn RecordFilter> = context.clone();

    let defaults = [HandlerConfig::new(HandlerKind::Console)];
    let handler_configs = if config.handlers.is_empty() {
        &defaults[..]
    } else {
        &config.handlers[..]
    };

    let mut pipeline = Pipeline::default();
    for handler_config in handler_configs {
        let level = match &handler_config.level {
            Some(level) => level.parse()?,
            None => min_severity,
        };
        let template = handler_config.format.as_deref().unwrap_or(&config.format);
        let formatter = RecordFormatter::new(template, &config.datefmt)?;
        let handler = make_handler(&handler_config.kind, formatter, registry, &queue)?;

        pipeline.push(
            HandlerSlot::new(handler)
                .with_min_severity(level)
                .with_filter(source_filter.clone())
                .with_filter(context_filter.clone()),
        );
    }

    Ok(BuiltPipeline {
        pipeline,
        min_severity,
        context,
        queue,
    })
}

fn make_handler(
    kind: &HandlerKind,
    formatter: RecordFormatter,
    registry: &HandlerRegistry,
    queue: &RecordQueue,
) -> Result<Box<dyn RecordHandler>, ConfigError> {
    let handler: Box<dyn RecordHandler> = match kind {
        HandlerKind::Console => Box::new(ConsoleHandler::stdout(formatter)),
        HandlerKind::Queued => Box::new(QueuedHandler::new(queue.clone())),
        HandlerKind::File {
            path,
            name,
            max_size,
            max_count,
        } => {
            let settings = FileSettings::resolve(path.as_deref(), name.as_deref(), max_size.as_ref(), *max_count)?;
            Box::new(RotatingFileHandler::open(
                &settings.dir,
                &settings.name,
                settings.max_bytes,
                settings.backup_count,
                formatter,
            )?)
        }
        HandlerKind::Custom { class, args } => registry.build(class, args)?,
    };
    Ok(handler)
}

/// Handles returned by [`init_logging`].
#[derive(Clone)]
pub struct LoggingHandles {
    /// Consumer side of the queue used by `queued` handlers.
    pub queue: RecordQueue,
    /// Shared context injector applied to every record.
    pub context: Arc<ContextInjector>,
}

/// Build the pipeline from `config` and install it as the global `tracing`
/// subscriber.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`PipelineLayer`] as the global
/// default subscriber, so every `tracing` event in the process goes
/// through the configured filters and handlers. Fails if a global
/// subscriber is already set.
pub fn init_logging(config: &LoggingConfig, registry: &HandlerRegistry) -> Result<LoggingHandles, InitError> {
    let built = build_pipeline(config, registry, RecordQueue::new())?;
    let handler_count = built.pipeline.len();
    let layer = PipelineLayer::new(Arc::new(built.pipeline), built.min_severity);

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!(handlers = handler_count, min_level = %built.min_severity, "logging pipeline installed");

    Ok(LoggingHandles {
        queue: built.queue,
        context: built.context,
    })
}

/// [`init_logging`] with the default configuration adjusted by the
/// `LOGGING__*` environment variables and no custom handlers.
pub fn init_default_logging() -> Result<LoggingHandles, InitError> {
    let mut config = LoggingConfig::default();
    config.apply_env();
    init_logging(&config, &HandlerRegistry::default())
}
