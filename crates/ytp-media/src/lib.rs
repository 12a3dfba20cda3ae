#![deny(unreachable_patterns)]
//! Filter graph assembly and FFmpeg CLI wrapper.
//!
//! This crate provides:
//! - Asset discovery and random sampling per category
//! - The effect catalog and its typed chain templates
//! - Placeholder binding of effect chains to concrete input indices
//! - Assembly of a single `-filter_complex` program from many effects
//! - Type-safe FFmpeg command building, progress parsing and cancellation

pub mod assets;
pub mod binder;
pub mod catalog;
pub mod command;
pub mod error;
pub mod graph;
pub mod progress;
pub mod render;
pub mod template;

pub use assets::{list_assets, resolve, AssetInventory};
pub use binder::{bind, BoundEffect, BoundInput, BoundInputs, InputOrigin, PlaceholderBinding, ResolvedSlots};
pub use catalog::{ChainSpec, EffectCatalog, EffectSpec, InputRequirement};
pub use command::{check_ffmpeg, EngineExecutor, EngineOutput, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use graph::{assemble, AssembledGraph, FilterGraphProgram, GraphAssembler, OutputLabels, FRAGMENT_SEPARATOR};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use render::{build_command, execute_plan, plan_render, render, RenderOutcome, RenderPlan, RenderRequest};
pub use template::{FragmentTemplate, Segment, Slot, StreamKind, TemplateError};
