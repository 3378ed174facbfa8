//! Runs the transformation for a book the gate accepted, then copies and
//! commits the result.

use crate::driverinfo;
use crate::error::{Error, ErrorKind, Result};
use crate::models::{BookJob, Outcome};
use crate::rename::{EPUB_EXT, FilenameResolver};
use crate::skip::SkipSet;
use crate::template::CopyPathGenerator;
use crate::transform::{TransformOptions, Transformer};
use directories::BaseDirs;
use exn::ResultExt;
use kte_config::PolicyFlags;
use kte_container::Container;
use std::path::{Path, PathBuf};
use time::UtcDateTime;
use tracing::instrument;

/// Everything a transformation needs besides the book itself.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    pub policy: &'a PolicyFlags,
    pub transformer: &'a dyn Transformer,
    /// Driver version recorded in the embedded driver record.
    pub version: &'a str,
    /// Device mount point, where `driveinfo.calibre` is read from.
    pub prefix: &'a Path,
    pub copy_paths: &'a CopyPathGenerator,
}

/// Transform `container`, then copy the original and commit the result over
/// the job's source file.
///
/// With `skip_failed`, a failed transformation leaves the source untouched,
/// records the book in `skip` and yields [`Outcome::Passthrough`]. Copy and
/// commit failures always propagate.
#[instrument(skip_all, fields(title = %job.book.title, uuid = %job.book.uuid))]
pub fn run(job: &BookJob, mut container: Container, ctx: &Invocation<'_>, skip: &mut SkipSet) -> Result<Outcome> {
    let policy = ctx.policy;
    if policy.skip_failed {
        tracing::info!("Failed conversions will be skipped");
    } else {
        tracing::info!("Failed conversions will raise exceptions");
    }

    if let Err(err) = transform(job, &mut container, ctx) {
        log_failure(job, &err, "Failed to process book");
        if !policy.skip_failed {
            return Err(err);
        }
        skip.insert(&job.book.uuid);
        return Ok(Outcome::Passthrough);
    }

    if !policy.extra_features {
        skip.insert(&job.book.uuid);
    }
    if let Some(dir) = policy.copy_dir() {
        copy_original(job, &expand_home(dir), ctx, skip)
            .inspect_err(|err| log_failure(job, err, "Failed to copy book"))?;
    }
    container
        .commit(&job.source)
        .or_raise(|| ErrorKind::Commit)
        .inspect_err(|err| log_failure(job, err, "Failed to commit book"))?;
    Ok(Outcome::Transformed)
}

fn log_failure(job: &BookJob, err: &Error, message: &str) {
    tracing::error!(
        title = %job.book.title,
        authors = %job.book.authors_display(),
        error = %err,
        "{message}"
    );
}

fn transform(job: &BookJob, container: &mut Container, ctx: &Invocation<'_>) -> Result<()> {
    let device_info = driverinfo::read_device_info(ctx.prefix)?;
    let record =
        driverinfo::build_record(device_info.as_deref(), ctx.version, &ctx.policy.render(), UtcDateTime::now())?;
    driverinfo::inject(container, &record)?;
    let options = TransformOptions::from_policy(ctx.policy);
    ctx.transformer.transform(container, &job.source, &job.book, &options).or_raise(|| ErrorKind::Transformation)
}

/// Copy the untransformed source into the copy directory, named the way it
/// will be named on the device.
fn copy_original(job: &BookJob, dir: &Path, ctx: &Invocation<'_>, skip: &SkipSet) -> Result<PathBuf> {
    let relative = ctx.copy_paths.generate(&job.book)?;
    let resolver = FilenameResolver::new(ctx.policy.extra_features, skip);
    let name = resolver.resolve(&format!("{relative}{EPUB_EXT}"), &job.book.uuid);
    let target = dir.join(name);
    tracing::info!(path = %target.display(), "Generated kepub file copy path");
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Copy(target.clone()))?;
    }
    std::fs::copy(&job.source, &target).or_raise(|| ErrorKind::Copy(target.clone()))?;
    Ok(target)
}

fn expand_home(dir: &str) -> PathBuf {
    match dir.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(rest.trim_start_matches('/')))
            .unwrap_or_else(|| PathBuf::from(dir)),
        _ => PathBuf::from(dir),
    }
}
