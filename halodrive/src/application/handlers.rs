use std::fmt::Write as _;
use std::path::PathBuf;

use halo_core::auth::{SignIn, SignUp};
use halo_core::error::Result;
use halo_core::present::{
    FileCategory, StorageUsage, category_stats, display_date, format_bytes, sorted_by_name,
    type_label,
};
use halo_core::upload::{collect_sources, download, upload};
use halo_core::{Credential, FileRow, Session};
use time::OffsetDateTime;

use super::Ctx;

const BAR_WIDTH: usize = 30;

pub fn handle_signin(ctx: &Ctx, form: SignIn) -> Result<()> {
    let session = form.submit(ctx.sessions.as_ref())?;
    println!("Signed in as {}", session.username);
    Ok(())
}

pub fn handle_signup(ctx: &Ctx, form: SignUp) -> Result<()> {
    let session = form.submit(ctx.sessions.as_ref())?;
    println!("Welcome, {}", session.first_name());
    Ok(())
}

pub fn handle_logout(ctx: &Ctx) -> Result<()> {
    ctx.sessions.clear()?;
    println!("Signed out");
    Ok(())
}

pub fn handle_whoami(ctx: &Ctx) -> Result<()> {
    let session = ctx.require_session()?;
    print!("{}", render_whoami(&session));
    Ok(())
}

pub async fn handle_upload(
    ctx: &Ctx,
    paths: Vec<PathBuf>,
    recursive: bool,
    mime_type: Option<String>,
) -> Result<()> {
    let session = ctx.require_session()?;
    let store = ctx.open_store().await?;
    let sources = collect_sources(&paths, recursive);
    let report = upload(&store, &sources, mime_type.as_deref()).await;

    for name in &report.saved {
        eprintln!("upload: {name}");
    }
    for (name, e) in &report.failed {
        eprintln!("upload failed: {name}: {e}");
    }

    // redraw with whatever landed
    let rows = store.rows().await?;
    print!(
        "{}",
        render_listing(&session, &rows, false, ctx.settings.capacity_bytes, now())
    );

    if !report.is_clean() {
        eprintln!(
            "upload: {} saved, {} failed",
            report.saved.len(),
            report.failed.len()
        );
    }
    match report.failed.into_iter().next() {
        Some((_, e)) => Err(e),
        None => Ok(()),
    }
}

pub async fn handle_ls(ctx: &Ctx, long: bool) -> Result<()> {
    let session = ctx.require_session()?;
    let store = ctx.open_store().await?;
    let rows = store.rows().await?;
    print!(
        "{}",
        render_listing(&session, &rows, long, ctx.settings.capacity_bytes, now())
    );
    Ok(())
}

pub async fn handle_get(ctx: &Ctx, name: String, out: PathBuf) -> Result<()> {
    ctx.require_session()?;
    let store = ctx.open_store().await?;
    let path = download(&store, &name, &out).await?;
    eprintln!("get: {} -> {}", name, path.display());
    Ok(())
}

pub async fn handle_rm(ctx: &Ctx, names: Vec<String>) -> Result<()> {
    ctx.require_session()?;
    let store = ctx.open_store().await?;
    for name in &names {
        store.delete_by_name(name).await?;
        eprintln!("rm: {name}");
    }
    Ok(())
}

pub async fn handle_stats(ctx: &Ctx) -> Result<()> {
    ctx.require_session()?;
    let store = ctx.open_store().await?;
    let rows = store.rows().await?;
    let stats = store.stats().await?;
    print!("{}", render_stats(&rows, ctx.settings.capacity_bytes));
    println!(
        "on disk: {} ({} reclaimable by `compact`)",
        format_bytes(stats.journal_bytes + stats.blob_bytes),
        format_bytes(stats.dead_bytes)
    );
    Ok(())
}

pub async fn handle_compact(ctx: &Ctx) -> Result<()> {
    ctx.require_session()?;
    let store = ctx.open_store().await?;
    let report = store.compact().await?;
    eprintln!(
        "compact: {} files, {} -> {}",
        report.files,
        format_bytes(report.bytes_before),
        format_bytes(report.bytes_after)
    );
    Ok(())
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

pub fn render_whoami(session: &Session) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "username: {}", session.username);
    if let Some(email) = session.email() {
        let _ = writeln!(out, "email:    {email}");
    } else if matches!(session.credential, Credential::Password { .. }) {
        let _ = writeln!(out, "signed in with a password");
    }
    out
}

pub fn render_listing(
    session: &Session,
    rows: &[FileRow],
    long: bool,
    capacity: u64,
    now: OffsetDateTime,
) -> String {
    let rows = sorted_by_name(rows.to_vec());
    let usage = StorageUsage::of(&rows, capacity);
    let mut out = String::new();
    let avatar = session.initial().map(|c| format!("[{c}] ")).unwrap_or_default();
    let _ = writeln!(out, "{avatar}Hello, {}", session.first_name());
    let _ = writeln!(
        out,
        "{} files, {} of {} used",
        rows.len(),
        format_bytes(usage.used),
        format_bytes(usage.capacity)
    );
    if rows.is_empty() {
        let _ = writeln!(out, "No files yet. Upload something to get started.");
        return out;
    }
    if long {
        let date = display_date(now);
        for r in &rows {
            let _ = writeln!(
                out,
                "{:>12}  {:<8}  {:<12}  {}  {}",
                format_bytes(r.size),
                type_label(&r.mime_type, &r.name),
                date,
                r.short_digest(),
                r.name
            );
        }
    } else {
        for r in &rows {
            let _ = writeln!(out, "{}", r.name);
        }
    }
    out
}

pub fn render_stats(rows: &[FileRow], capacity: u64) -> String {
    let usage = StorageUsage::of(rows, capacity);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Total storage: {} of {} used",
        format_bytes(usage.used),
        format_bytes(usage.capacity)
    );
    let _ = writeln!(
        out,
        "{} {:.1}%",
        usage.bar(BAR_WIDTH),
        usage.percent
    );
    let _ = writeln!(out, "Total files: {}", rows.len());
    for (cat, stat) in category_stats(rows) {
        if cat == FileCategory::Other && stat.count == 0 {
            continue;
        }
        let _ = writeln!(
            out,
            "{:<10} {:>5}  {}",
            cat.label(),
            stat.count,
            format_bytes(stat.bytes)
        );
    }
    out
}
