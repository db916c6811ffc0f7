use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use neurolearn_core::{
    update, AppState, AppViewModel, AssessmentStage, BackendStatus, ChatRole, Msg, SelectedFile,
    Tab, UploadPhase,
};
use neurolearn_engine::{
    ensure_cache_dir, ClipFileRecorder, ContentCache, EngineEvent, EngineHandle, EngineParts,
    FileCacheStore, ReqwestApiClient, SystemClock,
};
use neurolearn_logging::{learn_info, learn_warn};

use super::cli::{Cli, Command};
use super::config::{AppConfig, DEFAULT_CONFIG_FILE};
use super::effects::{now_ms, EffectRunner};
use super::input::{guess_mime, parse_chat_input, ChatInput};
use super::{logging, render};

const PUMP_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let loaded = AppConfig::load(cli.config.as_deref())?;
    let config = loaded.config.with_overrides(cli.base_url, cli.log_to);
    if let Err(err) = logging::initialize(&config.log_options()) {
        eprintln!("Warning: {err}");
    }
    match &loaded.source {
        Some(path) => learn_info!("Loaded config from {:?}", path),
        None => learn_info!("No {} found; using defaults", DEFAULT_CONFIG_FILE),
    }
    learn_info!("neurolearn {:?} against {}", cli.command, config.base_url);

    let mut session = Session::start(&config)?;
    match cli.command {
        Command::Ping => ping(&mut session, &config.base_url),
        Command::Upload { paths } => upload(&mut session, &paths),
        Command::Status { filename } => status(&session, &filename),
        Command::Files { refresh } => files(&mut session, refresh),
        Command::Summary { refresh, speak } => summary(&mut session, refresh, speak),
        Command::Links => links(&mut session),
        Command::Ask { question, file } => ask(&mut session, &question, file.as_deref()),
        Command::Voice { clip, file } => voice(&mut session, &clip, file.as_deref()),
        Command::Tts { text, learning } => tts(&session, &text, learning),
        Command::Chat => chat(&mut session),
        Command::Assess => assess(&mut session),
    }
}

/// Owns the core state and drives it with engine events.
struct Session {
    state: AppState,
    runner: EffectRunner,
    recorder: Arc<ClipFileRecorder>,
}

impl Session {
    fn start(config: &AppConfig) -> anyhow::Result<Self> {
        let settings = config.engine_settings();
        ensure_cache_dir(&settings.cache_dir)
            .with_context(|| format!("cache directory {:?}", settings.cache_dir))?;

        let api = ReqwestApiClient::new(&settings.api)
            .with_context(|| format!("backend url {:?}", settings.api.base_url))?;
        let cache = ContentCache::new(
            Arc::new(FileCacheStore::new(settings.cache_dir.clone())),
            Arc::new(SystemClock),
            settings.cache_policy.clone(),
        );
        let recorder = Arc::new(ClipFileRecorder::new());
        let parts = EngineParts {
            api: Arc::new(api),
            cache: Arc::new(cache),
            recorder: recorder.clone(),
        };
        let engine = EngineHandle::start(parts, settings).context("failed to start engine")?;

        Ok(Self {
            state: AppState::new(),
            runner: EffectRunner::new(engine),
            recorder,
        })
    }

    fn view(&self) -> AppViewModel {
        self.state.view()
    }

    fn engine(&self) -> &EngineHandle {
        self.runner.engine()
    }

    /// Applies `msg`, runs its effects, and returns the new view when something changed.
    fn dispatch(&mut self, msg: Msg) -> Option<AppViewModel> {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let view = state.consume_dirty().then(|| state.view());
        self.state = state;
        self.runner.enqueue(effects);
        view
    }

    fn run_until(
        &mut self,
        mut done: impl FnMut(&AppViewModel) -> bool,
        mut on_change: impl FnMut(&AppViewModel),
    ) -> anyhow::Result<AppViewModel> {
        loop {
            let view = self.view();
            if done(&view) {
                return Ok(view);
            }
            if let Some(msg) = self.runner.next_msg(PUMP_INTERVAL)? {
                if let Some(view) = self.dispatch(msg) {
                    on_change(&view);
                }
            }
        }
    }

    fn wait_for(
        &mut self,
        done: impl FnMut(&AppViewModel) -> bool,
    ) -> anyhow::Result<AppViewModel> {
        self.run_until(done, |_| {})
    }

    fn connect(&mut self) -> anyhow::Result<BackendStatus> {
        self.dispatch(Msg::SessionStarted);
        let view = self.wait_for(|view| view.backend != BackendStatus::Unknown)?;
        Ok(view.backend)
    }

    /// Switches to the learning tab and waits for its content to settle.
    fn open_learning(&mut self) -> anyhow::Result<AppViewModel> {
        self.dispatch(Msg::TabSelected(Tab::Learning));
        self.wait_for(|view| {
            !view.summary.loading
                && !view.links.loading
                && !view.files.loading
                && !view.chat.is_empty()
        })
    }

    fn choose_file(&mut self, file: Option<&str>) -> anyhow::Result<()> {
        let Some(file) = file else {
            return Ok(());
        };
        self.dispatch(Msg::FileChosen(file.to_string()));
        if self.state.selected_file() != Some(file) {
            bail!(
                "unknown document {file:?}; available:\n{}",
                render::files_block(&self.view().files, None)
            );
        }
        Ok(())
    }

    /// Waits for the current chat or voice request and returns what it appended.
    fn finish_chat_turn(&mut self, before: usize) -> anyhow::Result<Vec<String>> {
        let view = self.wait_for(|view| !view.chat_pending && !view.recording)?;
        if let Some(error) = view.chat_error {
            bail!(error);
        }
        Ok(view
            .chat
            .iter()
            .skip(before)
            .map(render::chat_line)
            .collect())
    }
}

fn ping(session: &mut Session, base_url: &str) -> anyhow::Result<()> {
    let backend = session.connect()?;
    println!("{}", render::backend_line(backend));
    if backend == BackendStatus::Disconnected {
        bail!("backend at {base_url} is not reachable");
    }
    Ok(())
}

fn upload(session: &mut Session, paths: &[PathBuf]) -> anyhow::Result<()> {
    let selected = paths
        .iter()
        .map(|path| selected_file(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    session.dispatch(Msg::FilesSelected(selected));

    let view = session.view();
    if let Some(stats) = view.last_selection {
        println!("{}", render::selection_line(stats));
    }
    if view.uploads.is_empty() {
        bail!("nothing to upload: only PDF files up to 50 MB are accepted");
    }

    let mut shown: HashMap<String, (u8, UploadPhase)> = HashMap::new();
    let mut show_changes = |view: &AppViewModel| {
        for row in &view.uploads {
            let key = (row.progress, row.phase);
            if shown.get(&row.name) != Some(&key) {
                shown.insert(row.name.clone(), key);
                println!("{}", render::upload_row(row));
            }
        }
    };
    show_changes(&view);
    let view = session.run_until(
        |view| view.uploads.iter().all(|row| row.phase.is_settled()),
        show_changes,
    )?;

    let failed = view
        .uploads
        .iter()
        .filter(|row| matches!(row.phase, UploadPhase::Failed | UploadPhase::NotFound))
        .count();
    if view.ready_for_learning {
        println!("Ready for learning: run `neurolearn summary` or `neurolearn chat`.");
    }
    if failed == view.uploads.len() {
        bail!("no document was processed");
    }
    if failed > 0 {
        learn_warn!("{} of {} uploads did not complete", failed, view.uploads.len());
    }
    Ok(())
}

fn selected_file(path: &Path) -> anyhow::Result<SelectedFile> {
    let metadata =
        fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    Ok(SelectedFile {
        mime: guess_mime(&name),
        name,
        size: metadata.len(),
        location: path.to_path_buf(),
    })
}

fn status(session: &Session, filename: &str) -> anyhow::Result<()> {
    session.engine().check_status(filename);
    loop {
        match session.engine().recv_timeout(PUMP_INTERVAL)? {
            Some(EngineEvent::ProcessingStatus { status, .. }) => {
                let state = state_label(status.status);
                if status.message.is_empty() {
                    println!("{filename}: {state}");
                } else {
                    println!("{filename}: {state} - {}", status.message);
                }
                return Ok(());
            }
            Some(EngineEvent::StatusCheckFailed { error, .. }) => bail!(error),
            Some(_) | None => {}
        }
    }
}

fn state_label(state: neurolearn_engine::ProcessingState) -> &'static str {
    match state {
        neurolearn_engine::ProcessingState::Processing => "processing",
        neurolearn_engine::ProcessingState::Completed => "completed",
        neurolearn_engine::ProcessingState::NotFound => "not_found",
    }
}

fn files(session: &mut Session, refresh: bool) -> anyhow::Result<()> {
    let mut view = session.open_learning()?;
    if refresh {
        session.dispatch(Msg::RefreshFiles);
        view = session.wait_for(|view| !view.files.loading)?;
    }
    println!(
        "{}",
        render::files_block(&view.files, view.selected_file.as_deref())
    );
    match view.files.error {
        Some(error) => bail!(error),
        None => Ok(()),
    }
}

fn summary(session: &mut Session, refresh: bool, speak: bool) -> anyhow::Result<()> {
    let mut view = session.open_learning()?;
    if refresh {
        session.dispatch(Msg::RefreshSummary);
        view = session.wait_for(|view| !view.summary.loading)?;
    }
    println!("{}", render::summary_block(&view.summary));
    if let Some(error) = view.summary.error {
        bail!(error);
    }

    if speak {
        session.dispatch(Msg::ReadSummaryAloud);
        let view = session.wait_for(|view| !view.speech_pending)?;
        match (view.speech_error, view.last_audio_url) {
            (Some(error), _) => println!("speech unavailable: {error}"),
            (None, Some(url)) => println!("audio: {url}"),
            (None, None) => {}
        }
    }
    Ok(())
}

fn links(session: &mut Session) -> anyhow::Result<()> {
    let view = session.open_learning()?;
    println!("{}", render::links_block(&view.links));
    match view.links.error {
        Some(error) => bail!(error),
        None => Ok(()),
    }
}

fn ask(session: &mut Session, question: &str, file: Option<&str>) -> anyhow::Result<()> {
    session.open_learning()?;
    session.choose_file(file)?;
    let before = session.view().chat.len();
    session.dispatch(Msg::ChatSubmitted {
        text: question.to_string(),
        at_ms: now_ms(),
    });
    let view = session.wait_for(|view| !view.chat_pending)?;
    if let Some(error) = view.chat_error {
        bail!(error);
    }
    let reply = view
        .chat
        .iter()
        .skip(before)
        .filter(|message| message.role == ChatRole::Bot)
        .map(|message| message.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    println!("{reply}");
    Ok(())
}

fn voice(session: &mut Session, clip: &Path, file: Option<&str>) -> anyhow::Result<()> {
    if !clip.is_file() {
        bail!("audio clip {} not found", clip.display());
    }
    session.open_learning()?;
    session.choose_file(file)?;
    for line in record_clip(session, clip)? {
        println!("{line}");
    }
    if let Some(url) = session.view().last_audio_url {
        println!("audio: {url}");
    }
    Ok(())
}

fn record_clip(session: &mut Session, clip: &Path) -> anyhow::Result<Vec<String>> {
    let before = session.view().chat.len();
    session.recorder.arm(clip);
    session.dispatch(Msg::RecordToggled);
    session.dispatch(Msg::RecordToggled);
    session.finish_chat_turn(before)
}

fn tts(session: &Session, text: &str, learning: bool) -> anyhow::Result<()> {
    if learning {
        session.engine().speak_summary(text);
    } else {
        session.engine().speak_reply(text);
    }
    loop {
        match session.engine().recv_timeout(PUMP_INTERVAL)? {
            Some(EngineEvent::SpeechReady { audio_url }) => {
                println!("{audio_url}");
                return Ok(());
            }
            Some(EngineEvent::SpeechUnavailable { message }) => bail!(message),
            Some(_) | None => {}
        }
    }
}

fn read_line(prompt: &str) -> io::Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn chat(session: &mut Session) -> anyhow::Result<()> {
    println!("{}", render::backend_line(session.connect()?));
    let view = session.open_learning()?;
    if let Some(file) = &view.selected_file {
        println!("Asking about {file}.");
    }
    println!("/files lists documents, /use <name> switches, /voice <clip> asks by voice, /quit exits.");
    for message in &view.chat {
        println!("{}", render::chat_line(message));
    }

    while let Some(line) = read_line("> ")? {
        let before = session.view().chat.len();
        let printed = match parse_chat_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Files => {
                let view = session.view();
                println!(
                    "{}",
                    render::files_block(&view.files, view.selected_file.as_deref())
                );
                continue;
            }
            ChatInput::Use(file) => {
                match session.choose_file(Some(&file)) {
                    Ok(()) => println!("Now asking about {file}."),
                    Err(err) => println!("{err}"),
                }
                continue;
            }
            ChatInput::Voice(clip) if !clip.is_file() => {
                println!("audio clip {} not found", clip.display());
                continue;
            }
            ChatInput::Voice(clip) => record_clip(session, &clip),
            ChatInput::Ask(text) => {
                session.dispatch(Msg::ChatSubmitted {
                    text,
                    at_ms: now_ms(),
                });
                session.finish_chat_turn(before)
            }
            ChatInput::Unknown(command) => {
                println!("unknown command {command:?}");
                continue;
            }
        };
        match printed {
            Ok(lines) => lines.iter().for_each(|line| println!("{line}")),
            Err(err) => {
                // The question stays in the transcript; only the reply is missing.
                for message in session.view().chat.iter().skip(before) {
                    println!("{}", render::chat_line(message));
                }
                println!("error: {err}");
            }
        }
    }
    Ok(())
}

fn assess(session: &mut Session) -> anyhow::Result<()> {
    println!("{}", render::backend_line(session.connect()?));
    println!("{}", render::assessment_block(&session.view().assessment));

    loop {
        let stage = session.view().assessment.stage;
        let prompt = match stage {
            AssessmentStage::Welcome => "[enter] generate a question, q to quit: ",
            AssessmentStage::Question => "[enter] answer it, q to quit: ",
            AssessmentStage::Answer => "your answer (/back to re-read the question): ",
            AssessmentStage::Feedback => "[r] try again, [enter] new question, q to quit: ",
        };
        let Some(line) = read_line(prompt)? else {
            break;
        };
        let line = line.trim();
        if line == "q" && stage != AssessmentStage::Answer {
            break;
        }

        match stage {
            AssessmentStage::Welcome => {
                session.dispatch(Msg::AssessmentGenerate);
            }
            AssessmentStage::Question => {
                session.dispatch(Msg::AssessmentBeginAnswer);
                continue;
            }
            AssessmentStage::Answer if line == "/back" => {
                session.dispatch(Msg::AssessmentBackToQuestion);
            }
            AssessmentStage::Answer => {
                session.dispatch(Msg::AssessmentAnswerChanged(line.to_string()));
                session.dispatch(Msg::AssessmentSubmit);
            }
            AssessmentStage::Feedback if line == "r" => {
                session.dispatch(Msg::AssessmentRetry);
                continue;
            }
            AssessmentStage::Feedback => {
                session.dispatch(Msg::AssessmentReset);
                session.dispatch(Msg::AssessmentGenerate);
            }
        }
        let view = session.wait_for(|view| !view.assessment.loading)?;
        println!("{}", render::assessment_block(&view.assessment));
    }
    Ok(())
}
