//! Stream a model file from a URL into a local folder, reporting progress to the host.

use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::value::Value;
use crate::host::context::HostContext;
use crate::host::node::Node;
use crate::host::progress::{ProgressEvent, ProgressSink};
use crate::host::schema::{InputDecl, NodeOutput, NodeSchema, OutputDecl, Resolved};

pub const DEFAULT_URL: &str =
    "https://huggingface.co/perilli/OCS_Models/resolve/main/VAE/Image/flux1_vae.safetensors";
pub const DEFAULT_FILENAME: &str = "flux1_vae.safetensors";

/// Read buffer size while streaming the body.
pub const CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Minimum advance, in percentage points, between two progress events.
pub const PROGRESS_STEP: f64 = 0.2;

/// Everything one download needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Target folder before `~` / `$VAR` expansion.
    pub folder: String,
    pub filename: String,
    /// Bearer token; `$NAME` is read from the environment.
    pub token: String,
    /// Host node id progress events are addressed to; no events without one.
    pub node_id: Option<String>,
}

/// Expand `$NAME` and `${NAME}` from `env`; unknown variables stay as written.
pub fn expand_vars(input: &str, env: &dyn Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        let (name, consumed) = match tail.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = tail
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(tail.len());
                (&tail[..end], end)
            }
        };
        match Some(name).filter(|n| !n.is_empty()).and_then(env) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

/// Expand variables, then a leading `~`, and make the result absolute against the cwd.
pub fn expand_folder(raw: &str, env: &dyn Fn(&str) -> Option<String>) -> NodeResult<PathBuf> {
    let expanded = expand_vars(raw, env);
    let home_relative = expanded
        .strip_prefix('~')
        .filter(|rest| rest.is_empty() || rest.starts_with('/'))
        .map(str::to_owned);
    let expanded = match (home_relative, env("HOME")) {
        (Some(rest), Some(home)) => format!("{home}{rest}"),
        _ => expanded,
    };
    let path = PathBuf::from(expanded);
    if path.is_absolute() {
        return Ok(path);
    }
    let abs = std::path::absolute(&path)
        .with_context(|| format!("resolve folder '{}'", path.display()))?;
    Ok(abs)
}

/// `$NAME` tokens are swapped for that variable when it is set.
pub fn resolve_token(token: &str, env: &dyn Fn(&str) -> Option<String>) -> String {
    token
        .strip_prefix('$')
        .and_then(env)
        .unwrap_or_else(|| token.to_string())
}

fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn http_err(url: &str) -> impl Fn(reqwest::Error) -> NodeError + '_ {
    move |e| NodeError::download(format!("{url}: {e}"))
}

fn report(progress: &dyn ProgressSink, node_id: Option<&str>, value: f64) {
    if let Some(node) = node_id {
        progress.send(ProgressEvent {
            node: node.to_string(),
            value,
            max: 100,
        });
    }
}

fn fetch(
    url: &str,
    token: &str,
    target: &Path,
    tmp: &Path,
    node_id: Option<&str>,
    progress: &dyn ProgressSink,
) -> NodeResult<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(None::<Duration>)
        .build()
        .map_err(http_err(url))?;

    let mut request = client.get(url);
    if !token.is_empty() {
        request = request.bearer_auth(token);
    }
    let mut response = request
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(http_err(url))?;
    let total = response.content_length().unwrap_or(0);

    let mut file =
        File::create(tmp).with_context(|| format!("create '{}'", tmp.display()))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut downloaded: u64 = 0;
    let mut last_report = 0.0;
    loop {
        let n = match response.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(NodeError::download(format!("{url}: {e}"))),
        };
        file.write_all(&buf[..n])
            .with_context(|| format!("write '{}'", tmp.display()))?;
        downloaded += n as u64;

        if total > 0 {
            let pct = downloaded as f64 / total as f64 * 100.0;
            if pct - last_report >= PROGRESS_STEP {
                tracing::debug!(url, percent = pct, "downloading");
                report(progress, node_id, pct);
                last_report = pct;
            }
        }
    }
    file.flush()
        .with_context(|| format!("flush '{}'", tmp.display()))?;
    drop(file);

    std::fs::rename(tmp, target)
        .with_context(|| format!("move '{}' into place", tmp.display()))?;
    if total > 0 {
        report(progress, node_id, 100.0);
    }
    Ok(())
}

/// Download `req.url` to `<folder>/<filename>` and return the final path.
///
/// An existing target is returned untouched without any network access. The body is streamed
/// to `<target>.tmp`, which is renamed into place on success and removed on failure.
pub fn download(
    req: &DownloadRequest,
    env: &dyn Fn(&str) -> Option<String>,
    progress: &dyn ProgressSink,
) -> NodeResult<PathBuf> {
    if req.url.is_empty() || req.filename.is_empty() {
        return Err(NodeError::validation(format!(
            "missing required values: url='{}', filename='{}'",
            req.url, req.filename
        )));
    }

    let folder = expand_folder(&req.folder, env)?;
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("cannot create target folder '{}'", folder.display()))?;

    let target = folder.join(&req.filename);
    if target.exists() {
        tracing::info!(path = %target.display(), "file already exists");
        return Ok(target);
    }

    let token = resolve_token(&req.token, env);
    tracing::info!(
        url = %req.url,
        path = %target.display(),
        authorized = !token.is_empty(),
        "downloading"
    );

    let tmp = tmp_path(&target);
    if let Err(err) = fetch(
        &req.url,
        &token,
        &target,
        &tmp,
        req.node_id.as_deref(),
        progress,
    ) {
        if tmp.exists()
            && let Err(rm) = std::fs::remove_file(&tmp)
        {
            tracing::warn!(error = %rm, path = %tmp.display(), "partial download left behind");
        }
        return Err(err);
    }

    tracing::info!(path = %target.display(), "download complete");
    Ok(target)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ModelDownloader;

const OUTPUTS: [OutputDecl; 1] = [OutputDecl::new("FILE_PATH", "STRING")];

impl Node for ModelDownloader {
    fn class_name(&self) -> &'static str {
        "OCS_ModelDownloader"
    }

    fn display_name(&self) -> &'static str {
        "Model Downloader"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Downloads a file from a URL to any folder, with optional bearer token.")
    }

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
            .required(InputDecl::string("url", DEFAULT_URL, false))
            .required(InputDecl::string("folder", "", false).tooltip(
                "Target directory (created if missing). Absolute or relative. \
                 Empty uses the models folder.",
            ))
            .required(InputDecl::string("filename", DEFAULT_FILENAME, false))
            .optional(
                InputDecl::string("token", "", false)
                    .tooltip("Optional bearer token. Use $VARNAME to pull from environment."),
            )
            .hidden(InputDecl::hidden("node_id"))
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &OUTPUTS
    }

    fn is_output_node(&self) -> bool {
        true
    }

    fn execute(&self, inputs: &Resolved, ctx: &HostContext) -> NodeResult<NodeOutput> {
        let mut folder = inputs.string("folder")?;
        if folder.is_empty() {
            folder = ctx.config().models_dir.display().to_string();
        }
        let node_id = match inputs.get("node_id") {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Int(id)) => Some(id.to_string()),
            _ => None,
        };
        let req = DownloadRequest {
            url: inputs.string("url")?,
            folder,
            filename: inputs.string("filename")?,
            token: inputs.string("token")?,
            node_id,
        };

        let env = |key: &str| std::env::var(key).ok();
        let path = match download(&req, &env, ctx.progress()) {
            Ok(path) => path.display().to_string(),
            Err(err) => {
                tracing::error!(error = %err, url = %req.url, "download failed");
                String::new()
            }
        };
        Ok(NodeOutput::new(vec![Value::String(path)]))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/model_downloader.rs"]
mod tests;
