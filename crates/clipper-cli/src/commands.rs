use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clipper_client::error::STREAM_INTERRUPTED;
use clipper_client::job_client::{STATUS_CANCELLED, STATUS_CANCEL_FAILED};
use clipper_client::{
    ClientConfig, ClientResult, ClipJobClient, Dispatch, HttpJobApi, JobApi, JobOutcome,
    ProgressView,
};
use clipper_models::{
    clip_duration, ClipForm, ClipRequest, CreditEstimate, JobId, Quality, RawForm, TimeField,
};
use tracing::{info, warn};

use crate::view::TerminalView;

/// Arguments of `clipper clip`.
#[derive(Debug, Clone)]
pub struct ClipArgs {
    pub url: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub quality: Quality,
    pub output: Option<PathBuf>,
}

enum Step<T> {
    Done(T),
    Interrupted,
}

/// Read one time value, reflowed as typed and normalized when done.
pub fn prompt_time<R: BufRead, W: Write>(
    field: &mut TimeField,
    label: &str,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<()> {
    write!(output, "{} (HH:MM:SS): ", label)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    field.on_input(line.trim(), false);
    field.on_blur();
    Ok(())
}

/// Fill in a clip form from arguments, prompting for missing times.
pub fn build_form<R: BufRead, W: Write>(
    args: &ClipArgs,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<ClipForm> {
    let mut form = ClipForm::new(args.url.clone(), args.quality);

    match &args.start {
        Some(start) => form.start = TimeField::new(start.clone()),
        None => {
            prompt_time(&mut form.start, "Start", input, output)?;
            form.blur_start();
        }
    }

    match &args.end {
        Some(end) => form.end = TimeField::new(end.clone()),
        None => {
            prompt_time(&mut form.end, "End", input, output)?;
            form.blur_end();
            writeln!(output, "Clip length: {}", form.duration())?;
        }
    }

    Ok(form)
}

/// Refuse a clip the account cannot pay for.
///
/// When the balance cannot be fetched the server stays the judge.
pub async fn check_credits<A: JobApi>(api: &A, estimate: &CreditEstimate) -> Result<()> {
    let credits = match api.credits().await {
        Ok(credits) => credits,
        Err(e) => {
            warn!("Could not fetch credits, submitting anyway: {}", e);
            return Ok(());
        }
    };

    estimate.ensure_affordable(credits.credits_left)?;
    Ok(())
}

/// Submit a clip and follow it until it ends or `interrupt` fires.
///
/// An interrupt during submission is held until the server has answered, so
/// a job it already accepted is cancelled rather than left running. The
/// dispatch of each event, including the clip download, is interruptible.
pub async fn run_job<A, V, F>(
    client: &mut ClipJobClient<A, V>,
    raw: &RawForm,
    interrupt: F,
) -> ClientResult<JobOutcome>
where
    A: JobApi,
    V: ProgressView,
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut interrupted = false;

    let submitted = {
        let submit = client.submit(raw);
        tokio::pin!(submit);
        loop {
            tokio::select! {
                result = &mut submit => break result,
                _ = &mut interrupt, if !interrupted => {
                    info!("Interrupted, cancelling once the server answers");
                    interrupted = true;
                }
            }
        }
    };
    let job = submitted?;
    info!("Tracking job {}", job);

    if interrupted {
        return Ok(cancel_job(client).await);
    }

    loop {
        let step = tokio::select! {
            event = client.next_event() => Step::Done(event),
            _ = &mut interrupt => Step::Interrupted,
        };
        let event = match step {
            Step::Done(Some(event)) => event,
            Step::Done(None) => return Ok(JobOutcome::Failed(STREAM_INTERRUPTED.to_string())),
            Step::Interrupted => return Ok(cancel_job(client).await),
        };

        let step = tokio::select! {
            dispatch = client.handle_stream_event(event) => Step::Done(dispatch),
            _ = &mut interrupt => Step::Interrupted,
        };
        match step {
            Step::Done(Dispatch::Finished(outcome)) => return Ok(outcome),
            Step::Done(_) => {}
            Step::Interrupted => return Ok(cancel_job(client).await),
        }
    }
}

async fn cancel_job<A: JobApi, V: ProgressView>(client: &mut ClipJobClient<A, V>) -> JobOutcome {
    match client.cancel("interrupt").await {
        Ok(_) => JobOutcome::Cancelled,
        Err(e) => {
            warn!("Cancel request failed: {}", e);
            JobOutcome::Failed(STATUS_CANCEL_FAILED.to_string())
        }
    }
}

pub async fn cmd_clip(mut config: ClientConfig, args: ClipArgs) -> Result<JobOutcome> {
    if let Some(dir) = &args.output {
        config.download_dir = dir.clone();
    }

    let form = {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        build_form(&args, &mut stdin.lock(), &mut stdout).context("Failed to read clip times")?
    };
    let raw = form.to_raw();

    let api = HttpJobApi::new(config.clone())?;
    let mut client = ClipJobClient::new(api, TerminalView::new(), config);

    if let Ok(request) = ClipRequest::from_form(&raw) {
        let estimate = CreditEstimate::for_request(&request);
        println!(":: {}", estimate.describe());
        if let Err(e) = check_credits(client.api(), &estimate).await {
            client.view().abandon(&e.to_string());
            return Err(e);
        }
    }

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let outcome = match run_job(&mut client, &raw, interrupt).await {
        Ok(outcome) => outcome,
        Err(e) => {
            client.view().abandon(&e.user_message());
            return Err(anyhow!(e.user_message()));
        }
    };

    match &outcome {
        JobOutcome::Completed { saved } => {
            let message = match saved {
                Some(path) => format!("Done: {}", path.display()),
                None => "Done".to_string(),
            };
            client.view().finish(&message);
        }
        JobOutcome::Failed(message) => {
            client.view().abandon(message);
            return Err(anyhow!(message.clone()));
        }
        JobOutcome::Cancelled => client.view().abandon(STATUS_CANCELLED),
    }

    Ok(outcome)
}

pub fn cmd_estimate(start: &str, end: &str, quality: Quality) -> Result<CreditEstimate> {
    let duration = clip_duration(start, end)?;
    let estimate = CreditEstimate::new(duration, quality);
    println!("{}", estimate.describe());
    Ok(estimate)
}

pub async fn cmd_credits(config: ClientConfig) -> Result<()> {
    let api = HttpJobApi::new(config)?;
    let credits = api
        .credits()
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    println!("Credits left: {:.2}", credits.credits_left);
    if let Some(reset) = credits.reset_time {
        println!("Resets at: {}", reset.to_rfc3339());
    }
    Ok(())
}

pub async fn cmd_cancel(config: ClientConfig, process_id: String, reason: String) -> Result<()> {
    let api = HttpJobApi::new(config)?;
    let job = JobId::from_string(process_id);
    api.cancel(&job, &reason)
        .await
        .map_err(|e| anyhow!(e.user_message()))?;

    println!(":: Cancelled {}", job);
    Ok(())
}
