//! Interactive dictation: speech playback driven from typed commands while
//! the student writes the text line by line.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use orthographe_audio::{
    fetch_speech, AudioBuffer, AudioError, AudioOutput, LoadOutcome, LoadTicket, NullOutput,
    PlaybackController, PlaybackEvent, PlaybackStatus, SynthesisRetry, SystemClock,
};
use orthographe_core::config::{AudioConfig, TrainerConfig};
use orthographe_core::error::TrainerError;
use orthographe_core::events::DomainEvent;
use orthographe_core::types::CollectionKind;
use orthographe_gemini::GenerationService;
use orthographe_trainer::{DictationSession, Trainer};

use crate::render::{self, Palette};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

const HELP: &str = "\
Tapez le texte ligne par ligne, puis :ok pour le faire corriger.
  :p       lecture / pause
  :lent    basculer entre lecture normale et lente
  :r       relancer la synthèse après une erreur
  :pos     position de lecture
  :efface  effacer la saisie en cours
  :ok      corriger (puis auto-correction)
  :q       quitter";

type SpeechResult = (LoadTicket, Result<AudioBuffer, AudioError>);

/// Typed line, split into a command or dictation text.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Toggle,
    Rate,
    Retry,
    Position,
    Clear,
    Submit,
    Quit,
    Help,
    Unknown(&'a str),
    Text(&'a str),
}

impl<'a> Input<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            ":p" | ":play" | ":pause" => Input::Toggle,
            ":lent" | ":normal" => Input::Rate,
            ":r" => Input::Retry,
            ":pos" => Input::Position,
            ":efface" => Input::Clear,
            ":ok" => Input::Submit,
            ":q" | ":quitter" => Input::Quit,
            ":aide" | ":h" | ":help" => Input::Help,
            cmd if cmd.starts_with(':') => Input::Unknown(cmd),
            _ => Input::Text(line),
        }
    }
}

#[cfg(feature = "device")]
fn open_output(config: &AudioConfig) -> Box<dyn AudioOutput> {
    if config.output_enabled {
        match orthographe_audio::DeviceOutput::open_default() {
            Ok(output) => return Box::new(output),
            Err(e) => tracing::warn!(error = %e, "audio device unavailable, playing silently"),
        }
    }
    Box::new(NullOutput)
}

#[cfg(not(feature = "device"))]
fn open_output(config: &AudioConfig) -> Box<dyn AudioOutput> {
    if config.output_enabled {
        tracing::info!("built without the `device` feature, playing silently");
    }
    Box::new(NullOutput)
}

/// Synthesize in the background and hand the result back with its ticket.
fn spawn_speech<S: GenerationService + 'static>(
    service: Arc<S>,
    ticket: LoadTicket,
    sample_rate: u32,
    retry: SynthesisRetry,
    tx: mpsc::UnboundedSender<SpeechResult>,
) {
    tokio::spawn(async move {
        let content = ticket.content().to_string();
        let result = fetch_speech(service.as_ref(), &content, ticket.slow(), sample_rate, retry).await;
        // The loop may already be gone.
        let _ = tx.send((ticket, result));
    });
}

fn print_event(event: &DomainEvent) {
    match event {
        DomainEvent::CatalogExtended { added, total, .. } => {
            println!("Catalogue enrichi : {added} nouveau(x) texte(s), {total} au total.");
        }
        DomainEvent::CatalogFetchFailed { reason, .. } => {
            println!("Impossible d'enrichir le catalogue ({reason}).");
        }
        DomainEvent::ItemCompleted { item_id, score, .. } => {
            println!("Texte {item_id} validé avec {score:.1}/10.");
        }
        _ => {}
    }
}

async fn grade<S: GenerationService>(
    trainer: &mut Trainer<S>,
    session: &mut DictationSession,
    draft: &mut Vec<String>,
    palette: Palette,
) {
    let submission = draft.join("\n");
    let result = if session.is_graded() {
        trainer.self_correct(session, &submission).await
    } else {
        trainer.submit(session, &submission).await
    };
    match result {
        Ok(outcome) => {
            let evaluation = &outcome.evaluation;
            println!();
            println!(
                "{}",
                render::annotated_submission(palette, &submission, &evaluation.errors)
            );
            println!();
            print!("{}", render::error_list(&evaluation.errors));
            println!(
                "{}",
                render::score_line(palette, evaluation.score, outcome.band, &outcome.breakdown)
            );
            if !evaluation.comment.is_empty() {
                println!("{}", evaluation.comment);
            }
            println!();
            println!("Texte original :");
            println!("{}", evaluation.correct_text);
            if outcome.self_correction {
                println!("(auto-correction : la progression n'est pas modifiée)");
            }
            println!("Corrigez votre texte puis :ok pour le vérifier, ou :q pour quitter.");
            draft.clear();
        }
        Err(TrainerError::EmptySubmission) => println!("Rien à corriger : tapez d'abord le texte."),
        Err(e) if e.is_remote() => {
            println!("Le service de correction ne répond pas ({e}). Réessayez avec :ok.")
        }
        Err(e) => println!("Correction impossible : {e}"),
    }
}

/// Run one dictation on `kind`, optionally on a given catalog item.
pub async fn run<S: GenerationService + 'static>(
    trainer: &mut Trainer<S>,
    config: &TrainerConfig,
    palette: Palette,
    kind: CollectionKind,
    item: Option<String>,
    slow: bool,
) -> Result<(), Box<dyn Error>> {
    let mut events = trainer.subscribe();
    trainer.ensure_catalog(kind).await?;

    let item_id = match item {
        Some(id) => id,
        None => trainer
            .next_item(kind)
            .map(|m| m.id.clone())
            .ok_or_else(|| TrainerError::UnknownItem(format!("{} (catalogue vide)", kind.key())))?,
    };

    println!("Préparation de la dictée…");
    let mut session = trainer.load_dictation(&item_id).await?;
    let meta = &session.text.metadata;
    println!(
        "Dictée {} : {} - {} ({} mots)",
        meta.id, meta.author, meta.source, session.text.word_count
    );
    println!("{HELP}");

    let retry = SynthesisRetry::from(&config.audio);
    let sample_rate = config.audio.sample_rate;
    let (tx, mut rx) = mpsc::unbounded_channel::<SpeechResult>();
    let mut player =
        PlaybackController::new(open_output(&config.audio), SystemClock::new(), &config.audio);
    let ticket = player.begin_load(session.content(), slow);
    spawn_speech(trainer.service().clone(), ticket, sample_rate, retry, tx.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft: Vec<String> = Vec::new();
    let mut ticker = tokio::time::interval(POLL_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    Input::Toggle => {
                        if !player.controls_enabled() {
                            println!("L'audio n'est pas encore prêt.");
                        } else if let Err(e) = player.toggle() {
                            println!("Lecture impossible : {e}");
                        }
                    }
                    Input::Rate => {
                        let slow = !player.is_slow();
                        if let Some(ticket) = player.begin_rate_change(slow) {
                            println!("{}", if slow { "Passage en lecture lente…" } else { "Passage en lecture normale…" });
                            spawn_speech(trainer.service().clone(), ticket, sample_rate, retry, tx.clone());
                        }
                    }
                    Input::Retry => {
                        if player.status() != PlaybackStatus::Errored {
                            println!("Rien à relancer.");
                        } else {
                            if let Some(reason) = player.last_error() {
                                println!("Dernier échec : {reason}. Nouvelle tentative…");
                            }
                            if let Some(ticket) = player.begin_rate_change(player.is_slow()) {
                                spawn_speech(trainer.service().clone(), ticket, sample_rate, retry, tx.clone());
                            }
                        }
                    }
                    Input::Position => println!(
                        "{}",
                        render::position_line(player.current_position(), player.duration().unwrap_or(0.0))
                    ),
                    Input::Clear => {
                        draft.clear();
                        println!("Saisie effacée.");
                    }
                    Input::Submit => grade(trainer, &mut session, &mut draft, palette).await,
                    Input::Quit => break,
                    Input::Help => println!("{HELP}"),
                    Input::Unknown(cmd) => println!("Commande inconnue {cmd} (:aide pour la liste)."),
                    Input::Text(text) => draft.push(text.to_string()),
                }
            }
            Some((ticket, result)) = rx.recv() => {
                match player.complete_load(ticket, result) {
                    Ok(LoadOutcome::Loaded(buffer)) => println!(
                        "Audio prêt ({}). :p pour écouter.",
                        render::position_line(0.0, buffer.duration())
                    ),
                    Ok(LoadOutcome::Stale) => {}
                    Err(e) => println!("Audio indisponible : {e}. :r pour réessayer."),
                }
            }
            Ok(event) = events.recv() => print_event(&event),
            _ = ticker.tick() => {
                if let Some(PlaybackEvent::Completed) = player.poll() {
                    println!("Lecture terminée.");
                }
            }
        }
    }

    player.dispose();
    tracing::info!(session = %session.id, attempts = session.attempts, "dictation closed");
    Ok(())
}
