use facility_portal::{AccessLevel, Portal, UiEvent, VirtualDocument, runtime};
use tokio::sync::mpsc;

/// main
///
/// Headless page check: loads one portal page into an in-memory document and
/// reports what the gate did with it.
///
/// Usage: `facility-portal <page> [<name> <level>]`. With a name and level a
/// session is opened first; without them the visit is anonymous.
#[tokio::main]
async fn main() {
    // 1. Configuration & Logging (fail-fast in production)
    let mut portal = Portal::bootstrap().expect("FATAL: portal storage could not be opened.");

    let mut args = std::env::args().skip(1);
    let page = args.next().unwrap_or_else(|| portal.config().home_page.clone());

    // 2. Optional Session
    if let (Some(name), Some(level)) = (args.next(), args.next()) {
        let level = level.parse::<u8>().ok().and_then(AccessLevel::new);
        let Some(level) = level else {
            tracing::error!("access level must be a number from 1 to 4");
            std::process::exit(2);
        };
        if let Err(e) = portal.sessions().login(&name, level) {
            tracing::error!("login error: {:?}", e);
            std::process::exit(2);
        }
    }

    // 3. One Page Load Through The Event Loop
    let mut doc = VirtualDocument::new(page.clone());
    let (tx, rx) = mpsc::unbounded_channel();
    if tx.send(UiEvent::PageLoad).is_err() {
        return;
    }
    drop(tx);
    runtime::run(&mut portal, &mut doc, rx).await;

    // 4. Report
    match (doc.denial_notice(), doc.last_navigation()) {
        (Some(notice), _) => tracing::warn!(page = %page, "{}", notice.title),
        (None, Some(target)) => tracing::info!(page = %page, redirect = %target, "redirected"),
        (None, None) => tracing::info!(
            page = %page,
            state = ?portal.gate().state(),
            "page rendered"
        ),
    }
}
