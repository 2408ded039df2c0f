//! PredIG Setup - Graphical User Interface
//!
//! A four-step wizard (mode, upload, simulation setup, submit) backed by a
//! host state file, plus a results tab for finished jobs.
//!
//! Environment:
//! - `PREDIG_STATE`: host state file (default `~/.predig-setup/state.json`)
//! - `PREDIG_SAMPLES`: sample data URL or directory (default `samples`)
//! - `PREDIG_RUNNER`: command the host starts on submit
//! - `PREDIG_RESULTS_URL`: base URL of the results API
//! - `PREDIG_FRACTIONAL_ALPHA`: accept alpha values between 0 and 1

use iced::widget::{
    button, column, container, pick_list, radio, row, rule, scrollable, text, text_editor,
    text_input,
};
use iced::{Center, Element, Fill, Subscription, Task, Theme};
use predig_setup::config::{BuiltinModel, ModelChoice};
use predig_setup::host::FileHost;
use predig_setup::modes::{describe, Mode};
use predig_setup::results::{ResultSet, ResultsClient, ViewerState};
use predig_setup::samples::{Sample, SampleSource};
use predig_setup::steps::Step;
use predig_setup::validation::AlphaPolicy;
use predig_setup::wizard::{BrowseTarget, Event, ModelKind, Wizard, WizardOptions};
use std::path::PathBuf;

fn main() -> iced::Result {
    env_logger::init();
    iced::application(App::new, App::update, App::view)
        .subscription(App::subscription)
        .theme(App::theme)
        .centered()
        .run()
}

// ============================================================================
// App State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TabId {
    Wizard,
    Results,
}

struct App {
    active_tab: TabId,
    wizard: Wizard<FileHost>,
    samples: SampleSource,

    // Editors mirror the configuration text; `*_synced` is the text last
    // copied in so outside changes (loads, mode switches) can be detected.
    input_editor: text_editor::Content,
    input_synced: String,
    alleles_editor: text_editor::Content,
    alleles_synced: String,

    // Raw text of the numeric fields as typed.
    alpha_text: String,
    precursor_text: String,
    length_text: String,

    loading: bool,

    // Results tab
    results_url: String,
    results_csv: String,
    results_job: String,
    viewer: Option<ViewerState>,
    download_status: String,
}

impl App {
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    fn subscription(&self) -> Subscription<Message> {
        iced::event::listen_with(|event, _status, _window| match event {
            iced::Event::Window(iced::window::Event::FileDropped(path)) => {
                Some(Message::FileDropped(path))
            }
            _ => None,
        })
    }

    fn new() -> (Self, Task<Message>) {
        let state_path = std::env::var_os("PREDIG_STATE")
            .map(PathBuf::from)
            .or_else(FileHost::default_path)
            .unwrap_or_else(|| PathBuf::from("predig-state.json"));
        let runner = std::env::var("PREDIG_RUNNER").ok();
        let samples = std::env::var("PREDIG_SAMPLES").unwrap_or_else(|_| "samples".to_string());
        let options = WizardOptions {
            alpha_policy: if std::env::var_os("PREDIG_FRACTIONAL_ALPHA").is_some() {
                AlphaPolicy::Fractional
            } else {
                AlphaPolicy::IntegerOnly
            },
        };

        log::info!("Using host state {}", state_path.display());
        let host = FileHost::new(state_path).with_runner(runner);
        let wizard = Wizard::activate(host, options);
        let config = wizard.config();

        let app = Self {
            active_tab: TabId::Wizard,
            samples: SampleSource::parse(&samples),
            input_editor: text_editor::Content::with_text(&config.raw_input),
            input_synced: config.raw_input.clone(),
            alleles_editor: text_editor::Content::with_text(&config.alleles),
            alleles_synced: config.alleles.clone(),
            alpha_text: config.alpha.to_string(),
            precursor_text: config.precursor_len.to_string(),
            length_text: String::new(),
            loading: false,
            results_url: std::env::var("PREDIG_RESULTS_URL").unwrap_or_default(),
            results_csv: String::new(),
            results_job: String::new(),
            viewer: None,
            download_status: String::new(),
            wizard,
        };
        (app, Task::none())
    }

    /// Copy configuration text into the editors if it changed elsewhere.
    fn sync_editors(&mut self) {
        let config = self.wizard.config();
        if config.raw_input != self.input_synced {
            self.input_editor = text_editor::Content::with_text(&config.raw_input);
            self.input_synced = config.raw_input.clone();
        }
        if config.alleles != self.alleles_synced {
            self.alleles_editor = text_editor::Content::with_text(&config.alleles);
            self.alleles_synced = config.alleles.clone();
        }
    }

    /// Hand an event to the wizard and exit once the host dismissed it.
    fn dispatch(&mut self, event: Event) -> Task<Message> {
        self.wizard.dispatch(event);
        self.sync_editors();
        if self.wizard.is_closed() {
            iced::exit()
        } else {
            Task::none()
        }
    }

    fn model_kind(&self) -> ModelKind {
        match self.wizard.config().model {
            ModelChoice::Provided(_) => ModelKind::Provided,
            ModelChoice::Custom(_) => ModelKind::Custom,
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Debug, Clone)]
enum Message {
    TabSelected(TabId),

    // Wizard
    Wizard(Event),
    InputEdited(text_editor::Action),
    AllelesEdited(text_editor::Action),
    AlphaEdited(String),
    PrecursorEdited(String),
    LengthEdited(String),
    LengthSubmitted,
    LoadSample(Sample),
    SampleLoaded(Sample, Result<String, String>),
    FileDropped(PathBuf),

    // Results
    ResultsUrlChanged(String),
    ResultsCsvChanged(String),
    ResultsJobChanged(String),
    FetchResults,
    ResultsFetched(ViewerState),
    Download(bool),
    DownloadTarget(bool, Option<PathBuf>),
    Downloaded(Result<PathBuf, String>),
}

// ============================================================================
// Update
// ============================================================================

impl App {
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
                Task::none()
            }

            Message::Wizard(event) => self.dispatch(event),

            // -- Editors --
            Message::InputEdited(action) => {
                let is_edit = action.is_edit();
                self.input_editor.perform(action);
                if !is_edit {
                    return Task::none();
                }
                self.input_synced = self.input_editor.text();
                self.dispatch(Event::InputChanged(self.input_synced.clone()))
            }
            Message::AllelesEdited(action) => {
                let is_edit = action.is_edit();
                self.alleles_editor.perform(action);
                if !is_edit {
                    return Task::none();
                }
                self.alleles_synced = self.alleles_editor.text();
                self.dispatch(Event::AllelesChanged(self.alleles_synced.clone()))
            }

            // -- Numeric fields: the wizard keeps the last accepted value --
            Message::AlphaEdited(value) => {
                self.alpha_text = value.clone();
                self.dispatch(Event::AlphaChanged(value))
            }
            Message::PrecursorEdited(value) => {
                self.precursor_text = value.clone();
                self.dispatch(Event::PrecursorLenChanged(value))
            }
            Message::LengthEdited(value) => {
                self.length_text = value;
                Task::none()
            }
            Message::LengthSubmitted => {
                let value = std::mem::take(&mut self.length_text);
                self.dispatch(Event::PeptideLengthAdded(value))
            }

            // -- Sample data --
            Message::LoadSample(sample) => {
                self.loading = true;
                let source = self.samples.clone();
                Task::perform(
                    run_blocking(move || source.load(sample).map_err(|e| format!("{:#}", e))),
                    move |result| {
                        Message::SampleLoaded(
                            sample,
                            result.unwrap_or_else(|| Err("Sample download was interrupted".into())),
                        )
                    },
                )
            }
            Message::SampleLoaded(sample, result) => {
                self.loading = false;
                match sample {
                    Sample::Input(_) => self.dispatch(Event::InputLoaded(result)),
                    Sample::Alleles => self.dispatch(Event::AllelesLoaded(result)),
                }
            }

            // -- Files dropped on the window --
            Message::FileDropped(path) => self.dispatch(Event::FileDropped(path)),

            // -- Results --
            Message::ResultsUrlChanged(v) => {
                self.results_url = v;
                Task::none()
            }
            Message::ResultsCsvChanged(v) => {
                self.results_csv = v;
                Task::none()
            }
            Message::ResultsJobChanged(v) => {
                self.results_job = v;
                Task::none()
            }
            Message::FetchResults => {
                self.viewer = Some(ViewerState::Loading);
                let (url, csv) = (self.results_url.clone(), self.results_csv.clone());
                Task::perform(
                    run_blocking(move || {
                        ViewerState::from_fetch(
                            ResultsClient::new(&url, &csv).and_then(|client| client.fetch()),
                        )
                    }),
                    |state| {
                        Message::ResultsFetched(state.unwrap_or_else(|| {
                            ViewerState::Failed("Results request was interrupted".to_string())
                        }))
                    },
                )
            }
            Message::ResultsFetched(state) => {
                self.viewer = Some(state);
                Task::none()
            }
            Message::Download(simulation) => {
                let name = if self.results_job.trim().is_empty() {
                    "predig_results".to_string()
                } else {
                    self.results_job.trim().to_string()
                };
                let (file_name, filter) = if simulation {
                    (format!("{}.zip", name), ("Zip archive", ["zip"]))
                } else {
                    (format!("{}.csv", name), ("CSV files", ["csv"]))
                };
                Task::perform(
                    async move {
                        rfd::AsyncFileDialog::new()
                            .set_file_name(file_name)
                            .add_filter(filter.0, &filter.1)
                            .save_file()
                            .await
                            .map(|f| f.path().to_path_buf())
                    },
                    move |path| Message::DownloadTarget(simulation, path),
                )
            }
            Message::DownloadTarget(simulation, path) => {
                let Some(dest) = path else {
                    return Task::none();
                };
                self.download_status = "Downloading...".to_string();
                let (url, csv) = (self.results_url.clone(), self.results_csv.clone());
                let job = Some(self.results_job.clone());
                Task::perform(
                    run_blocking(move || {
                        ResultsClient::new(&url, &csv)
                            .map(|client| client.with_job_name(job))
                            .and_then(|client| client.download(simulation, &dest))
                            .map_err(|e| format!("{:#}", e))
                    }),
                    |result| {
                        Message::Downloaded(
                            result.unwrap_or_else(|| Err("Download was interrupted".to_string())),
                        )
                    },
                )
            }
            Message::Downloaded(result) => {
                self.download_status = match result {
                    Ok(path) => format!("Saved {}", path.display()),
                    Err(e) => format!("Error: {}", e),
                };
                Task::none()
            }
        }
    }
}

// ============================================================================
// View
// ============================================================================

impl App {
    fn view(&self) -> Element<'_, Message> {
        let tab_bar = row![
            tab_button("Setup", TabId::Wizard, self.active_tab),
            tab_button("Results", TabId::Results, self.active_tab),
        ]
        .spacing(4);

        let content: Element<'_, Message> = match self.active_tab {
            TabId::Wizard => self.view_wizard(),
            TabId::Results => self.view_results(),
        };

        let body = container(content).padding(20).width(Fill).height(Fill);

        column![
            container(tab_bar).padding([10, 20]),
            rule::horizontal(1),
            body,
        ]
        .into()
    }

    fn view_wizard(&self) -> Element<'_, Message> {
        let current = self.wizard.current_step();

        let step_bar = row(self
            .wizard
            .overview()
            .into_iter()
            .map(|(step, summary)| step_button(step, summary, current)))
        .spacing(8);

        let page: Element<'_, Message> = match current {
            Step::Mode => self.view_mode_step(),
            Step::Upload => self.view_upload_step(),
            Step::Parameters => self.view_parameters_step(),
            Step::Submit => self.view_submit_step(),
        };

        let mut back = button(text("Back").size(13)).style(button::secondary);
        if !self.wizard.steps().is_first() {
            back = back.on_press(Message::Wizard(Event::Back));
        }
        let forward: Element<'_, Message> = if self.wizard.steps().is_terminal() {
            button(text("Execute").size(13))
                .on_press(Message::Wizard(Event::Execute))
                .style(button::success)
                .into()
        } else {
            button(text("Continue").size(13))
                .on_press(Message::Wizard(Event::Next))
                .into()
        };

        let mut footer = row![back, forward].spacing(10).align_y(Center);
        if let Some(status) = self.wizard.status() {
            footer = footer.push(text(status).size(13).color(ERROR_COLOR));
        }
        if !self.wizard.sync_available() {
            footer = footer.push(
                text("Changes are not being saved to the host")
                    .size(13)
                    .color(ERROR_COLOR),
            );
        }

        column![
            step_bar,
            rule::horizontal(1),
            scrollable(page).height(Fill),
            rule::horizontal(1),
            footer,
        ]
        .spacing(12)
        .into()
    }

    // -- Step 1: exploration mode --
    fn view_mode_step(&self) -> Element<'_, Message> {
        let selected = Some(self.wizard.config().mode);
        let choices = Mode::ALL.into_iter().map(|mode| {
            column![
                radio(mode.label(), mode, selected, |m| Message::Wizard(
                    Event::ModeSelected(m)
                )),
                text(describe(mode).description).size(13).color(MUTED_COLOR),
            ]
            .spacing(4)
            .into()
        });

        column![
            text("Choose an exploration mode").size(20),
            column(choices).spacing(14),
        ]
        .spacing(16)
        .into()
    }

    // -- Step 2: input upload --
    fn view_upload_step(&self) -> Element<'_, Message> {
        let mode = self.wizard.config().mode;
        let descriptor = describe(mode);

        let mut actions = row![
            button(text(format!("Browse {}", descriptor.file_label())).size(13))
                .on_press(Message::Wizard(Event::Browse(BrowseTarget::Input))),
        ]
        .spacing(10)
        .align_y(Center);
        actions = if self.loading {
            actions.push(text("Loading...").size(13))
        } else {
            actions.push(
                button(text("Load sample").size(13))
                    .on_press(Message::LoadSample(Sample::Input(mode)))
                    .style(button::secondary),
            )
        };

        let editor = text_editor(&self.input_editor)
            .placeholder("Paste the input here, drop a file on the window, or browse...")
            .on_action(Message::InputEdited)
            .font(iced::Font::MONOSPACE)
            .height(320);

        column![
            text(format!("Upload {} input", descriptor.label)).size(20),
            text(descriptor.upload_hint()).size(13).color(MUTED_COLOR),
            actions,
            editor,
            diagnostic_line(self.wizard.input_diagnostic().map(|d| d.to_string())),
        ]
        .spacing(12)
        .into()
    }

    // -- Step 3: simulation setup --
    fn view_parameters_step(&self) -> Element<'_, Message> {
        let config = self.wizard.config();
        let kind = Some(self.model_kind());

        let model_tabs = row![
            radio("Provided models", ModelKind::Provided, kind, |k| {
                Message::Wizard(Event::ModelKindSelected(k))
            }),
            radio("Custom model", ModelKind::Custom, kind, |k| {
                Message::Wizard(Event::ModelKindSelected(k))
            }),
        ]
        .spacing(20);

        let model_row: Element<'_, Message> = match &config.model {
            ModelChoice::Provided(model) => pick_list(BuiltinModel::ALL, Some(*model), |m| {
                Message::Wizard(Event::ModelSelected(m))
            })
            .into(),
            ModelChoice::Custom(path) => file_picker(
                "Model (.pkl)",
                path,
                |p| Message::Wizard(Event::CustomModelChanged(p)),
                Message::Wizard(Event::Browse(BrowseTarget::CustomModel)),
            ),
        };

        let mut page = column![
            text("Simulation setup").size(20),
            text("Model").size(16),
            model_tabs,
            model_row,
        ]
        .spacing(12);

        if config.mode.uses_alleles() {
            page = page.push(rule::horizontal(1)).push(self.view_alleles());
        }

        let chips = config.peptide_lengths.values().iter().map(|&len| {
            button(text(format!("{}  x", len)).size(13))
                .on_press(Message::Wizard(Event::PeptideLengthRemoved(len)))
                .style(button::secondary)
                .into()
        });

        page = page
            .push(rule::horizontal(1))
            .push(text("Parameters").size(16))
            .push(file_picker(
                "Matrix (.mat)",
                &config.matrix_path,
                |p| Message::Wizard(Event::MatrixPathChanged(p)),
                Message::Wizard(Event::Browse(BrowseTarget::Matrix)),
            ))
            .push(labeled_input(
                "Alpha",
                &self.alpha_text,
                Message::AlphaEdited,
            ))
            .push(labeled_input(
                "Precursor length",
                &self.precursor_text,
                Message::PrecursorEdited,
            ))
            .push(
                row![
                    text("Peptide lengths").width(130),
                    row(chips).spacing(6),
                    text_input("Add length", &self.length_text)
                        .on_input(Message::LengthEdited)
                        .on_submit(Message::LengthSubmitted)
                        .width(100),
                ]
                .spacing(10)
                .align_y(Center),
            )
            .push(diagnostic_line(
                self.wizard.field_error().map(|e| e.to_string()),
            ));

        page.into()
    }

    fn view_alleles(&self) -> Element<'_, Message> {
        let mut actions = row![
            button(text("Browse allele list").size(13))
                .on_press(Message::Wizard(Event::Browse(BrowseTarget::Alleles))),
        ]
        .spacing(10);
        if !self.loading {
            actions = actions.push(
                button(text("Load sample").size(13))
                    .on_press(Message::LoadSample(Sample::Alleles))
                    .style(button::secondary),
            );
        }

        column![
            text("HLA alleles").size(16),
            text("One allele per line, e.g. HLA-A*02:01").size(13).color(MUTED_COLOR),
            actions,
            text_editor(&self.alleles_editor)
                .on_action(Message::AllelesEdited)
                .font(iced::Font::MONOSPACE)
                .height(140),
            diagnostic_line(self.wizard.allele_diagnostic().map(|d| d.to_string())),
        ]
        .spacing(8)
        .into()
    }

    // -- Step 4: submit --
    fn view_submit_step(&self) -> Element<'_, Message> {
        let config = self.wizard.config();
        let problems = self.wizard.problems();

        let summary = column![
            summary_row("Mode", config.mode.label().to_string()),
            summary_row("Model", config.model.display_name()),
            summary_row("Peptide lengths", config.peptide_lengths.to_string()),
            summary_row("Precursor length", config.precursor_len.to_string()),
            summary_row("Alpha", config.alpha.to_string()),
            summary_row("Seed", config.seed.to_string()),
        ]
        .spacing(4);

        let checks: Element<'_, Message> = if problems.is_empty() {
            text("Ready to run").size(13).color(OK_COLOR).into()
        } else {
            column(
                problems
                    .into_iter()
                    .map(|p| text(p).size(13).color(ERROR_COLOR).into()),
            )
            .spacing(4)
            .into()
        };

        column![
            text("Submit simulation").size(20),
            text("Press Execute to start the prediction job on the host.")
                .size(13)
                .color(MUTED_COLOR),
            summary,
            rule::horizontal(1),
            checks,
        ]
        .spacing(12)
        .into()
    }

    // -- Results tab --
    fn view_results(&self) -> Element<'_, Message> {
        let form = column![
            labeled_input("Results URL", &self.results_url, Message::ResultsUrlChanged),
            labeled_input("Output CSV", &self.results_csv, Message::ResultsCsvChanged),
            labeled_input("Job name", &self.results_job, Message::ResultsJobChanged),
            row![
                button(text("Fetch").size(13)).on_press(Message::FetchResults),
                button(text("Download CSV").size(13))
                    .on_press(Message::Download(false))
                    .style(button::secondary),
                button(text("Download simulation").size(13))
                    .on_press(Message::Download(true))
                    .style(button::secondary),
                text(&self.download_status).size(13),
            ]
            .spacing(10)
            .align_y(Center),
        ]
        .spacing(8);

        let grid: Element<'_, Message> = match &self.viewer {
            None => column![].into(),
            Some(ViewerState::Loading) => text("Loading...").size(13).into(),
            Some(ViewerState::Failed(msg)) => text(format!("Error: {}", msg))
                .size(13)
                .color(ERROR_COLOR)
                .into(),
            Some(ViewerState::Loaded(set)) => results_grid(set),
        };

        column![form, rule::horizontal(1), grid].spacing(12).into()
    }
}

// ============================================================================
// Helper widgets
// ============================================================================

const MUTED_COLOR: iced::Color = iced::Color::from_rgb(0.6, 0.6, 0.6);
const OK_COLOR: iced::Color = iced::Color::from_rgb(0.4, 0.9, 0.4);
const ERROR_COLOR: iced::Color = iced::Color::from_rgb(0.95, 0.4, 0.4);

/// Most rows rendered in the results grid.
const GRID_ROWS: usize = 500;

/// Render a tab button, styled differently when active.
fn tab_button(label: &str, tab: TabId, active: TabId) -> Element<'_, Message> {
    let btn = button(text(label).size(14));
    if tab == active {
        btn.style(button::primary).into()
    } else {
        btn.on_press(Message::TabSelected(tab))
            .style(button::secondary)
            .into()
    }
}

/// A step in the step indicator: number and title, with the summary below.
fn step_button<'a>(step: Step, summary: Option<String>, current: Step) -> Element<'a, Message> {
    let label = column![
        text(format!("{}. {}", step.index() + 1, step.title())).size(14),
        text(summary.unwrap_or_default()).size(11),
    ]
    .spacing(2);

    let btn = button(label).on_press(Message::Wizard(Event::StepSelected(step.index())));
    if step == current {
        btn.style(button::primary).into()
    } else {
        btn.style(button::secondary).into()
    }
}

/// Render a file picker row: label + text input + browse button.
fn file_picker<'a, F>(label: &'a str, value: &str, on_change: F, on_browse: Message) -> Element<'a, Message>
where
    F: Fn(String) -> Message + 'a,
{
    row![
        text(label).width(130),
        text_input("Select file...", value).on_input(on_change).width(Fill),
        button(text("Browse").size(13)).on_press(on_browse),
    ]
    .spacing(10)
    .align_y(Center)
    .into()
}

fn labeled_input<'a>(
    label: &'a str,
    value: &str,
    on_change: fn(String) -> Message,
) -> Element<'a, Message> {
    row![
        text(label).width(130),
        text_input("", value).on_input(on_change).width(Fill),
    ]
    .spacing(10)
    .align_y(Center)
    .into()
}

fn summary_row<'a>(label: &'a str, value: String) -> Element<'a, Message> {
    row![
        text(label).size(13).width(160).color(MUTED_COLOR),
        text(value).size(13),
    ]
    .spacing(10)
    .into()
}

fn diagnostic_line<'a>(message: Option<String>) -> Element<'a, Message> {
    match message {
        Some(msg) => text(msg).size(13).color(ERROR_COLOR).into(),
        None => column![].into(),
    }
}

fn results_grid(set: &ResultSet) -> Element<'_, Message> {
    let header = row(set
        .columns
        .iter()
        .map(|c| text(c.as_str()).size(13).width(140).into()))
    .spacing(6);

    let rows = set.rows.iter().take(GRID_ROWS).map(|r| {
        row(set.columns.iter().map(|c| {
            text(ResultSet::cell_text(r, c))
                .size(12)
                .font(iced::Font::MONOSPACE)
                .width(140)
                .into()
        }))
        .spacing(6)
        .into()
    });

    let mut grid = column![header, rule::horizontal(1)].spacing(4);
    grid = grid.extend(rows);
    if set.rows.len() > GRID_ROWS {
        grid = grid.push(
            text(format!("... {} more rows", set.rows.len() - GRID_ROWS))
                .size(12)
                .color(MUTED_COLOR),
        );
    }

    scrollable(grid).direction(scrollable::Direction::Both {
        vertical: scrollable::Scrollbar::default(),
        horizontal: scrollable::Scrollbar::default(),
    })
    .height(Fill)
    .into()
}

// ============================================================================
// Background work
// ============================================================================

/// Run blocking work (file and network I/O) on its own thread and await the
/// result from the UI runtime. `None` if the thread died before answering.
fn run_blocking<T, F>(work: F) -> impl std::future::Future<Output = Option<T>>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = futures::channel::oneshot::channel();
    std::thread::spawn(move || {
        let _ = tx.send(work());
    });
    async move { rx.await.ok() }
}
