// Console driver for the reconciliation engine.
// Demonstrates the intended concurrency shape: the pipeline runs on a worker
// thread, events flow back over a channel, and the interactive thread drains
// that queue on a fixed interval (prompts travel over a reply channel).

use anyhow::Result;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use profit_recon::{analyze, Analytics, AnalysisOutcome, Collaborator, RunConfig, Severity};

// ============================================================================
// EVENTS
// ============================================================================

enum Event {
    Progress(u8, String),
    Log(String, Severity),
    PromptColumn {
        purpose: String,
        columns: Vec<String>,
        reply: mpsc::Sender<Option<usize>>,
    },
    PromptSave {
        reply: mpsc::Sender<Option<PathBuf>>,
    },
}

/// Collaborator that marshals every engine call onto the interactive thread.
struct ChannelCollaborator {
    tx: mpsc::Sender<Event>,
}

impl Collaborator for ChannelCollaborator {
    fn prompt_column_choice(&self, purpose: &str, columns: &[String]) -> Option<usize> {
        let (reply_tx, reply_rx) = mpsc::channel();
        let event = Event::PromptColumn {
            purpose: purpose.to_string(),
            columns: columns.to_vec(),
            reply: reply_tx,
        };
        if self.tx.send(event).is_err() {
            return None;
        }
        reply_rx.recv().ok().flatten()
    }

    fn prompt_save_path(&self) -> Option<PathBuf> {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.tx.send(Event::PromptSave { reply: reply_tx }).is_err() {
            return None;
        }
        reply_rx.recv().ok().flatten()
    }

    fn report_progress(&self, percent: u8, status: &str) {
        let _ = self
            .tx
            .send(Event::Progress(percent, status.to_string()));
    }

    fn log_event(&self, message: &str, severity: Severity) {
        let _ = self.tx.send(Event::Log(message.to_string(), severity));
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: profit-recon <profitability-file> <discount-file> [output.xlsx]");
        std::process::exit(2);
    }

    let config = RunConfig {
        profitability_path: PathBuf::from(&args[1]),
        discount_path: PathBuf::from(&args[2]),
        output_path: args.get(3).map(PathBuf::from),
    };

    let (tx, rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let collab = ChannelCollaborator { tx };
        analyze(&config, &collab)
    });

    // Drain the event queue on a fixed polling interval until the worker
    // drops its sender.
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => handle_event(event),
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let outcome = match worker.join() {
        Ok(outcome) => outcome,
        Err(_) => AnalysisOutcome::Failed("analysis thread panicked".to_string()),
    };

    match outcome {
        AnalysisOutcome::Completed(report) => {
            println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("Analysis complete: {}", report.stats.summary());
            println!("Output: {}", report.output_path.display());

            let analytics = Analytics::new(&report.result);
            let kpi = analytics.kpi_summary();
            println!("Total net profit:  {:.2}", kpi.total_net_profit);
            println!("Mean net profit:   {:.2}", kpi.mean_net_profit);
            println!(
                "Top product:       {} ({:.2})",
                kpi.top_product, kpi.top_product_profit
            );
            println!(
                "Products: {} total, {} profitable, {} at a loss",
                kpi.total_products, kpi.profitable_count, kpi.loss_count
            );
            Ok(())
        }
        AnalysisOutcome::Cancelled => {
            println!("\nAnalysis cancelled.");
            Ok(())
        }
        AnalysisOutcome::Failed(message) => {
            eprintln!("\nAnalysis failed: {}", message);
            std::process::exit(1);
        }
    }
}

fn handle_event(event: Event) {
    match event {
        Event::Progress(percent, status) => {
            println!("[{:3}%] {}", percent, status);
        }
        Event::Log(message, severity) => match severity {
            Severity::Warning => println!("  WARN  {}", message),
            Severity::Error => println!("  ERROR {}", message),
            _ => println!("        {}", message),
        },
        Event::PromptColumn {
            purpose,
            columns,
            reply,
        } => {
            let _ = reply.send(ask_column(&purpose, &columns));
        }
        Event::PromptSave { reply } => {
            let _ = reply.send(ask_save_path());
        }
    }
}

/// Numbered column menu on stdin; empty input declines.
fn ask_column(purpose: &str, columns: &[String]) -> Option<usize> {
    println!("\nSelect the {} column:", purpose);
    for (i, column) in columns.iter().enumerate() {
        println!("  {}: {}", i, column);
    }
    print!("Column number (empty to cancel): ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return None;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<usize>().ok()
}

fn ask_save_path() -> Option<PathBuf> {
    print!("\nOutput file path (empty to cancel): ");
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return None;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}
