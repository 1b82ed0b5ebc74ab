use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

use super::cli::Cli;
use super::client::{QueryClient, ReviewApi};
use super::data_io::{DataFormat, default_output_path, detect_data_format, export_items};
use super::error::TransportError;
use super::label_form::SubmitTicket;
use super::queue::{LoadOutcome, LoadTicket};
use super::resources::{ResourceAction, ResourceClient, ResourceKind};
use super::selection::{SelectOutcome, SelectTicket};
use super::session::ReviewSession;
use super::tui::draw_loop;
use super::types::{QueueItem, QueuePage};
use super::view::{DetailView, QueueBody, project};

#[derive(Debug)]
pub enum ReviewEvent {
    Queue {
        ticket: LoadTicket,
        result: Result<QueuePage, TransportError>,
    },
    Detail {
        ticket: SelectTicket,
        result: Result<QueueItem, TransportError>,
    },
    Submitted {
        ticket: SubmitTicket,
        result: Result<QueueItem, TransportError>,
    },
}

#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn ReviewApi>,
    tx: UnboundedSender<ReviewEvent>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn ReviewApi>, tx: UnboundedSender<ReviewEvent>) -> Self {
        Self { api, tx }
    }

    pub fn load(&self, ticket: LoadTicket) {
        debug!(
            seq = ticket.seq(),
            corrective = ticket.is_corrective(),
            "dispatching queue load"
        );
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.list_queue(ticket.filter()).await;
            let _ = tx.send(ReviewEvent::Queue { ticket, result });
        });
    }

    pub fn select(&self, ticket: SelectTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.get_item(ticket.id()).await;
            let _ = tx.send(ReviewEvent::Detail { ticket, result });
        });
    }

    pub fn submit(&self, ticket: SubmitTicket) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.submit_label(ticket.id(), ticket.submission()).await;
            let _ = tx.send(ReviewEvent::Submitted { ticket, result });
        });
    }
}

fn describe(err: &TransportError) -> String {
    if let Some(body) = err.body() {
        debug!(status = ?err.status(), %body, "error response body");
    }
    match err.status() {
        Some(status) => format!("{} (HTTP {status})", err.detail()),
        None => err.detail().to_string(),
    }
}

pub fn handle_review_event(
    session: &mut ReviewSession,
    dispatcher: &Dispatcher,
    event: ReviewEvent,
) -> Option<String> {
    match event {
        ReviewEvent::Queue { ticket, result } => match session.on_queue_result(ticket, result) {
            LoadOutcome::Accepted | LoadOutcome::Stale => None,
            LoadOutcome::Failed(err) => Some(format!("Queue load failed: {}", describe(&err))),
            LoadOutcome::Reissue(next) => {
                let offset = next.filter().offset;
                dispatcher.load(next);
                Some(format!("Offset past the end, reloading from {offset}"))
            }
        },
        ReviewEvent::Detail { ticket, result } => {
            let id = ticket.id().to_string();
            match session.on_detail_result(ticket, result) {
                SelectOutcome::Applied | SelectOutcome::Stale => None,
                SelectOutcome::Vanished => Some(format!("{id} left the queue before it loaded")),
                SelectOutcome::Failed(err) => {
                    Some(format!("Could not load {id}: {}", describe(&err)))
                }
            }
        }
        ReviewEvent::Submitted { ticket, result } => {
            let failure = result.as_ref().err().map(describe);
            match session.on_submit_result(&ticket, result) {
                Some(reload) => {
                    dispatcher.load(reload);
                    Some(format!(
                        "Saved {} as {}",
                        ticket.id(),
                        ticket.submission().label
                    ))
                }
                None => failure.map(|detail| format!("Save failed: {detail}")),
            }
        }
    }
}

pub fn export_target(cli: &Cli, client: &QueryClient) -> (PathBuf, DataFormat) {
    let configured: DataFormat = cli.format.into();
    match &cli.output {
        Some(path) => (path.clone(), detect_data_format(path, configured)),
        None => (
            PathBuf::from(default_output_path(client.base(), configured)),
            configured,
        ),
    }
}

pub async fn run_headless(cli: &Cli, client: QueryClient) -> anyhow::Result<()> {
    if let Some(resource) = cli.resource {
        let kind = ResourceKind::from(resource);
        let body = cli
            .resource_body
            .as_deref()
            .map(serde_json::from_str::<serde_json::Value>)
            .transpose()
            .context("--resource-body is not valid JSON")?;
        let action = ResourceAction::from_parts(cli.resource_id.clone(), body, cli.delete);
        let value = ResourceClient::new(&client, kind)
            .perform(&action)
            .await
            .with_context(|| format!("{action:?} on {} failed", kind.label()))?;
        if !value.is_null() {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        info!(resource = kind.label(), ?action, "resource request done");
        return Ok(());
    }

    let mut session = ReviewSession::new(cli.filter(), cli.labels(), cli.user.clone());
    if let LoadOutcome::Failed(err) = session.load_now(&client, cli.filter()).await {
        return Err(err).context("failed to load the review queue");
    }

    if let Some(id) = cli.select.as_deref() {
        match session.select_now(&client, id).await {
            SelectOutcome::Applied => {}
            SelectOutcome::Failed(err) => {
                return Err(err).with_context(|| format!("failed to load item {id}"));
            }
            SelectOutcome::Vanished | SelectOutcome::Stale => {
                anyhow::bail!("item {id} is not on the requested page");
            }
        }

        if let Some(label) = cli.label.as_deref() {
            let form = session.form_mut();
            form.set_label(label);
            if let Some(confidence) = &cli.confidence {
                form.confidence = confidence.clone();
            }
            if let Some(notes) = &cli.notes {
                form.notes = notes.clone();
            }
            if let Some(count) = &cli.count {
                form.count = count.clone();
            }
            let saved = session
                .submit_now(&client)
                .await
                .with_context(|| format!("failed to label {id}"))?;
            info!(id = %saved.id, label = ?saved.human_label, "label saved");
        }
    }

    let view = project(&session);
    match &view.body {
        QueueBody::Rows(rows) => {
            for row in rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    row.id, row.detector, row.model_label, row.confidence, row.received, row.status
                );
            }
        }
        QueueBody::Failed(detail) => warn!(%detail, "queue reload failed"),
        QueueBody::Empty | QueueBody::Loading => {}
    }
    if let DetailView::Item { id, fields, .. } = &view.detail {
        println!();
        println!("{id}");
        for (title, value) in fields {
            println!("  {title:<18}{value}");
        }
    }

    if cli.output.is_some() {
        let (path, format) = export_target(cli, &client);
        let written = export_items(&path, format, session.queue().items())
            .with_context(|| format!("failed to export to {}", path.display()))?;
        eprintln!("exported {written} items to {}", path.display());
    }

    eprintln!(
        "{} ({}, {})",
        view.meta, view.filter_summary, view.page_label
    );
    Ok(())
}

pub fn run_tui(cli: &Cli, client: QueryClient) -> anyhow::Result<()> {
    let export = export_target(cli, &client);
    let (tx, mut rx) = mpsc::unbounded_channel::<ReviewEvent>();
    let dispatcher = Dispatcher::new(Arc::new(client), tx);
    let mut session = ReviewSession::new(cli.filter(), cli.labels(), cli.user.clone());
    dispatcher.load(session.begin_load(cli.filter()));

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let tui_result = draw_loop(
        &mut terminal,
        &mut session,
        &dispatcher,
        &mut rx,
        (export.0.as_path(), export.1),
    );

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    tui_result.context("terminal UI failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::{ScriptedApi, labeled_item, sample_item, sample_page};
    use crate::app::types::Filter;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn harness(api: ScriptedApi) -> (Dispatcher, UnboundedReceiver<ReviewEvent>, Arc<ScriptedApi>) {
        let api = Arc::new(api);
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(api.clone(), tx);
        (dispatcher, rx, api)
    }

    fn session() -> ReviewSession {
        ReviewSession::new(
            Filter::default(),
            ["YES", "NO"].map(String::from).to_vec(),
            Some("ana".into()),
        )
    }

    #[tokio::test]
    async fn corrective_reload_goes_back_through_the_channel() {
        let (dispatcher, mut rx, api) = harness(ScriptedApi::with_pages(vec![
            Ok(sample_page(&[], 80)),
            Ok(sample_page(&["p30"], 80)),
        ]));
        let mut session = session();

        dispatcher.load(session.begin_load(Filter::new(true, None, 50, 100)));
        let event = rx.recv().await.unwrap();
        let notice = handle_review_event(&mut session, &dispatcher, event);
        assert_eq!(notice.as_deref(), Some("Offset past the end, reloading from 30"));

        let event = rx.recv().await.unwrap();
        assert_eq!(handle_review_event(&mut session, &dispatcher, event), None);
        assert_eq!(session.queue().items()[0].id, "p30");
        assert_eq!(api.list_calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn submit_echo_then_reload() {
        let (dispatcher, mut rx, api) = harness(ScriptedApi::with_pages(vec![
            Ok(sample_page(&["a"], 1)),
            Ok(sample_page(&[], 0)),
        ]));
        api.push_item(Ok(sample_item("a")));
        api.push_item(Ok(labeled_item("a", "YES", "ana")));
        let mut session = session();

        dispatcher.load(session.refresh());
        let event = rx.recv().await.unwrap();
        handle_review_event(&mut session, &dispatcher, event);
        dispatcher.select(session.begin_select("a"));
        let event = rx.recv().await.unwrap();
        handle_review_event(&mut session, &dispatcher, event);

        session.choose_label(0);
        dispatcher.submit(session.begin_submit().unwrap());
        let event = rx.recv().await.unwrap();
        let notice = handle_review_event(&mut session, &dispatcher, event);
        assert_eq!(notice.as_deref(), Some("Saved a as YES"));
        assert_eq!(
            session
                .selection()
                .detail()
                .and_then(|d| d.human_label.as_deref()),
            Some("YES")
        );

        let event = rx.recv().await.unwrap();
        handle_review_event(&mut session, &dispatcher, event);
        assert!(session.queue().items().is_empty());
        assert_eq!(session.selection().current_id(), None);
    }

    #[tokio::test]
    async fn failed_detail_is_reported() {
        let (dispatcher, mut rx, api) = harness(ScriptedApi::with_pages(vec![Ok(
            sample_page(&["a"], 1),
        )]));
        api.push_item(Err(TransportError::from_status(
            404,
            None,
            r#"{"detail":"gone"}"#.into(),
        )));
        let mut session = session();

        dispatcher.load(session.refresh());
        let event = rx.recv().await.unwrap();
        handle_review_event(&mut session, &dispatcher, event);
        dispatcher.select(session.begin_select("a"));
        let event = rx.recv().await.unwrap();
        assert_eq!(
            handle_review_event(&mut session, &dispatcher, event).as_deref(),
            Some("Could not load a: gone (HTTP 404)")
        );
    }
}
