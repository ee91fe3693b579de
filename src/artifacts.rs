//! Generated artifacts: the committed relational and GraphQL schema files,
//! plus the generated Rust types file.
//!
//! `generate` writes fresh artifacts; `validate` regenerates in memory and
//! byte-compares against the committed files, reporting exactly which are
//! stale. Validation covers the two schema artifacts only; the types file is
//! derived output and rewritten on every generate.

use crate::config::StrataConfig;
use crate::error::{Result, StrataError};
use crate::graphql;
use crate::relational::print_relational;
use crate::schema::InitialisedSchema;
use crate::typegen::print_types;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Relational,
    Graphql,
}

impl ArtifactKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Relational => "relational",
            ArtifactKind::Graphql => "graphql",
        }
    }

    pub fn path(&self, config: &StrataConfig, project_root: &Path) -> PathBuf {
        match self {
            ArtifactKind::Relational => config.relational_artifact_path(project_root),
            ArtifactKind::Graphql => config.graphql_artifact_path(project_root),
        }
    }
}

fn with_header(comment: &str, body: &str) -> String {
    format!(
        "{c} This file is automatically generated by strata, do not modify it manually.\n\
         {c} Modify your source schema instead.\n\n{body}\n",
        c = comment,
        body = body,
    )
}

/// The full committed text of the GraphQL artifact.
pub fn graphql_artifact(schema: &InitialisedSchema) -> String {
    with_header("#", &graphql::print_sdl(schema))
}

/// The full committed text of the relational artifact.
pub fn relational_artifact(schema: &InitialisedSchema) -> String {
    with_header("//", &print_relational(schema))
}

/// The full text of the generated types file.
pub fn types_artifact(schema: &InitialisedSchema) -> String {
    with_header("//", &print_types(schema))
}

/// Writes all artifacts, returning the written paths in a stable order.
pub fn generate(
    schema: &InitialisedSchema,
    config: &StrataConfig,
    project_root: &Path,
) -> Result<Vec<PathBuf>> {
    let targets = [
        (
            config.relational_artifact_path(project_root),
            relational_artifact(schema),
        ),
        (
            config.graphql_artifact_path(project_root),
            graphql_artifact(schema),
        ),
        (
            config.types_artifact_path(project_root),
            types_artifact(schema),
        ),
    ];

    let mut written = Vec::with_capacity(targets.len());
    for (path, content) in targets {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        debug!(path = %path.display(), "wrote artifact");
        written.push(path);
    }
    info!(count = written.len(), "artifacts generated");
    Ok(written)
}

/// Regenerates the schema artifacts in memory and byte-compares them against
/// the committed files. Returns the stale kinds; an empty list means the
/// committed artifacts are up to date. A missing committed file is stale.
pub fn validate(
    schema: &InitialisedSchema,
    config: &StrataConfig,
    project_root: &Path,
) -> Result<Vec<ArtifactKind>> {
    let expected = [
        (ArtifactKind::Relational, relational_artifact(schema)),
        (ArtifactKind::Graphql, graphql_artifact(schema)),
    ];

    let mut stale = Vec::new();
    for (kind, fresh) in expected {
        let path = kind.path(config, project_root);
        let committed = match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        if committed.as_deref() != Some(fresh.as_str()) {
            debug!(artifact = kind.name(), path = %path.display(), "artifact is stale");
            stale.push(kind);
        }
    }
    Ok(stale)
}

/// Formats a stale set for error reporting: `relational`, `graphql`, `both`.
pub fn describe_stale(stale: &[ArtifactKind]) -> String {
    if stale.len() >= 2 {
        "both".to_string()
    } else {
        stale.first().map(|k| k.name().to_string()).unwrap_or_default()
    }
}

/// A validation failure as an error, for callers that want a non-zero exit.
pub fn validate_strict(
    schema: &InitialisedSchema,
    config: &StrataConfig,
    project_root: &Path,
) -> Result<()> {
    let stale = validate(schema, config, project_root)?;
    if stale.is_empty() {
        Ok(())
    } else {
        Err(StrataError::Artifact(format!(
            "committed schema artifacts are stale ({}); run `strata generate`",
            describe_stale(&stale)
        )))
    }
}
