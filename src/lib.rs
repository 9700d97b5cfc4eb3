//! Per-source level filtering, context injection and a pollable record
//! queue for `tracing`.
//!
//! Events become [`record::LogRecord`]s in [`layer::PipelineLayer`], pass
//! through each handler's filter chain ([`filter::SourceLevelFilter`] then
//! [`context::ContextInjector`]) and are emitted by handlers. The
//! [`handler::QueuedHandler`] pushes them into a [`queue::RecordQueue`]
//! that an independent consumer polls with `try_dequeue`, or hands to
//! [`drain::spawn_drain`].

pub mod error;
pub mod severity;
pub mod record;
pub mod filter;
pub mod context;
pub mod queue;
pub mod format;
pub mod handler;
pub mod file;
pub mod registry;
pub mod pipeline;
pub mod layer;

pub mod env;
pub mod config;
pub mod init;

pub mod sink;
pub mod noop_sink;
pub mod drain;
