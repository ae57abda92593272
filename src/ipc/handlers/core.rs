use crate::db;
use crate::fixtures;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::optional_bool;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::{Path, PathBuf};

/// Opens (creating if needed) the workspace database and makes it current.
/// Seeds the demo catalog into an empty workspace when `seed_demo` is set.
/// Returns whether seeding happened.
pub fn open_workspace(state: &mut AppState, path: &Path, seed_demo: bool) -> anyhow::Result<bool> {
    let conn = db::open_db(path)?;
    let seeded = if seed_demo && db::workspace_is_empty(&conn)? {
        db::seed_catalog(&conn, &fixtures::demo_catalog())?;
        true
    } else {
        false
    };
    tracing::info!(
        workspace = %path.to_string_lossy(),
        seeded,
        "workspace opened"
    );
    state.workspace = Some(path.to_path_buf());
    state.db = Some(conn);
    Ok(seeded)
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };
    let seed_demo = match optional_bool(&req.params, "seedDemo") {
        Ok(v) => v.unwrap_or(true),
        Err(e) => return e.response(&req.id),
    };

    match open_workspace(state, &path, seed_demo) {
        Ok(seeded) => ok(
            &req.id,
            json!({ "workspacePath": path.to_string_lossy(), "seeded": seeded }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
