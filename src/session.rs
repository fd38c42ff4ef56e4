//! Per-connection session pipeline.
//!
//! Each WebSocket connection gets one session: CONNECTING while waiting
//! for the first audio frame, ACTIVE while three tasks run (receive
//! loop feeding the decoder, decode loop driving segmentation and
//! dispatch, idle monitor forcing finalization during input gaps),
//! DRAINING once input ends, CLOSED after the decoder is reaped.
//! Sessions share nothing with each other beyond the immutable
//! [`SessionContext`].

use crate::audio::format::sniff_container;
use crate::config::{Config, SegmenterMode};
use crate::decoder::{DecodeRead, SampleDecoder};
use crate::defaults;
use crate::dispatch::{TranscriptionDispatcher, TranscriptionResult};
use crate::error::{Result, VoxgateError};
use crate::segmenter::{SegmentEvent, Segmenter, Utterance};
use crate::stt::{DialogueResponder, SpeechBackend};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Everything a session needs that outlives any one connection.
pub struct SessionContext {
    pub config: Config,
    pub backend: Arc<dyn SpeechBackend>,
    pub responder: Option<Arc<dyn DialogueResponder>>,
    pub quiet: bool,
    pub verbosity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Draining,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

fn set_state(label: &str, state: &mut SessionState, next: SessionState, verbosity: u8) {
    *state = next;
    if verbosity >= 1 {
        eprintln!("{}: {}", label, next);
    }
}

/// Drive one session from first frame to teardown.
///
/// `frames` carries the client's binary WebSocket payloads; results go
/// out on `results` until the client side hangs up, after which they
/// are dropped. Returns `Err` only for failures that should close the
/// connection (decoder spawn, backend auth).
pub async fn run_session(
    ctx: Arc<SessionContext>,
    id: u64,
    mut frames: mpsc::Receiver<Vec<u8>>,
    results: mpsc::Sender<TranscriptionResult>,
) -> Result<()> {
    let label = format!("session {}", id);
    let mut state = SessionState::Connecting;
    if ctx.verbosity >= 1 {
        eprintln!("{}: {}", label, state);
    }

    // The container is sniffed from the first frame, so the decoder
    // cannot start before it arrives.
    let Some(first) = frames.recv().await else {
        if ctx.verbosity >= 1 {
            eprintln!("{}: closed before sending audio", label);
        }
        return Ok(());
    };
    let format = sniff_container(&first);
    if !ctx.quiet {
        eprintln!("{}: {} stream", label, format);
    }

    let mut decoder = SampleDecoder::start(
        &ctx.config.decoder,
        format,
        ctx.config.audio.sample_rate,
        ctx.verbosity,
    )?;
    let mut input = decoder.take_input()?;
    set_state(&label, &mut state, SessionState::Active, ctx.verbosity);

    let (activity_tx, mut activity_rx) = watch::channel(Instant::now());
    let (flush_tx, mut flush_rx) = mpsc::channel::<()>(1);

    // Receive loop: client frames go straight to decoder stdin. Closing
    // the channel closes stdin, which makes the decoder flush and exit.
    let receive_label = label.clone();
    let receive = tokio::spawn(async move {
        match input.write(&first).await {
            Ok(()) => activity_tx.send(Instant::now()).unwrap_or(()),
            Err(e) => {
                eprintln!("voxgate: {}: {e}", receive_label);
                input.close();
                return;
            }
        }
        while let Some(frame) = frames.recv().await {
            if let Err(e) = input.write(&frame).await {
                eprintln!("voxgate: {}: {e}", receive_label);
                break;
            }
            activity_tx.send(Instant::now()).unwrap_or(());
        }
        input.close();
    });

    // Idle monitor: when no frame has arrived for the configured gap,
    // nudge the decode loop to finalize what it holds. Fires once per
    // activity burst; the decode loop owns the segmenter, so the nudge
    // goes over a channel rather than touching state from here.
    let idle_timeout = Duration::from_millis(ctx.config.session.idle_timeout_ms);
    let idle_monitor = tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(Duration::from_millis(defaults::IDLE_POLL_MS));
        let mut last_flushed: Option<Instant> = None;
        loop {
            ticker.tick().await;
            let last = *activity_rx.borrow();
            if last_flushed == Some(last) {
                continue;
            }
            if last.elapsed() >= idle_timeout {
                if flush_tx.send(()).await.is_err() {
                    break;
                }
                last_flushed = Some(last);
            }
        }
    });

    let mode = ctx.config.segmenter.mode;
    let mut segmenter = Segmenter::new(&ctx.config.segmenter, &ctx.config.audio);
    let mut dispatcher = TranscriptionDispatcher::new(
        &ctx.config,
        Arc::clone(&ctx.backend),
        ctx.responder.clone(),
        label.clone(),
        ctx.quiet,
        ctx.verbosity,
    );
    if ctx.verbosity >= 1 {
        eprintln!("{}: recognizing via {}", label, dispatcher.backend_name());
    }

    // Decode loop: the single owner of the segmenter and dispatcher.
    let mut outcome = async {
        loop {
            tokio::select! {
                read = decoder.read_chunk() => match read? {
                    DecodeRead::Chunk(chunk) => {
                        let event = segmenter.push(&chunk, dispatcher.turn_has_text());
                        handle_event(&mut dispatcher, &results, mode, event).await?;
                    }
                    DecodeRead::EndOfStream => break,
                },
                Some(()) = flush_rx.recv() => {
                    if let Some(utterance) = segmenter.force_finalize() {
                        if ctx.verbosity >= 1 {
                            eprintln!("{}: idle gap, finalizing early", label);
                        }
                        finalize(&mut dispatcher, &results, mode, utterance).await?;
                    }
                }
            }
        }
        Ok::<(), VoxgateError>(())
    }
    .await;

    set_state(&label, &mut state, SessionState::Draining, ctx.verbosity);
    if outcome.is_ok() {
        // Whatever is still buffered goes out as one last utterance;
        // silence gating does not apply at end of stream.
        if let Some(utterance) = segmenter.flush() {
            outcome = finalize(&mut dispatcher, &results, mode, utterance).await;
        }
    }

    idle_monitor.abort();
    receive.abort();
    idle_monitor.await.unwrap_or(());
    receive.await.unwrap_or(());
    match decoder.finish().await {
        Ok(status) if !status.success() => {
            if ctx.verbosity >= 1 {
                eprintln!("{}: decoder exited with {}", label, status);
            }
        }
        Ok(_) => {}
        Err(e) => eprintln!("voxgate: {}: {e}", label),
    }
    set_state(&label, &mut state, SessionState::Closed, ctx.verbosity);

    outcome
}

async fn deliver(results: &mpsc::Sender<TranscriptionResult>, result: TranscriptionResult) {
    // A send failure means the client is gone; the session winds down
    // on its own when the frame channel closes.
    results.send(result).await.unwrap_or(());
}

/// Route one finalized utterance through the mode's dispatch path.
async fn finalize(
    dispatcher: &mut TranscriptionDispatcher,
    results: &mpsc::Sender<TranscriptionResult>,
    mode: SegmenterMode,
    utterance: Utterance,
) -> Result<()> {
    match mode {
        SegmenterMode::Batch => {
            if let Some(result) = dispatcher.dispatch(&utterance).await? {
                deliver(results, result).await;
            }
        }
        SegmenterMode::Streaming => {
            if let Some(partial) = dispatcher.dispatch_partial(utterance.pcm).await? {
                deliver(results, partial).await;
            }
            if let Some(turn) = dispatcher.complete_turn() {
                deliver(results, turn).await;
            }
        }
    }
    Ok(())
}

async fn handle_event(
    dispatcher: &mut TranscriptionDispatcher,
    results: &mpsc::Sender<TranscriptionResult>,
    mode: SegmenterMode,
    event: SegmentEvent,
) -> Result<()> {
    match event {
        SegmentEvent::Buffered => {}
        SegmentEvent::Finalized(utterance) => {
            finalize(dispatcher, results, mode, utterance).await?;
        }
        SegmentEvent::PartialPass(pcm) => {
            if let Some(partial) = dispatcher.dispatch_partial(pcm).await? {
                deliver(results, partial).await;
            }
        }
        SegmentEvent::TurnBoundary => {
            if let Some(turn) = dispatcher.complete_turn() {
                deliver(results, turn).await;
            }
        }
    }
    Ok(())
}
