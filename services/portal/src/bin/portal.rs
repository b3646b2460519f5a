//! services/portal/src/bin/portal.rs

use clap::{Args, Parser, Subcommand};
use course_portal_core::domain::{
    CourseDraft, CourseFilter, LessonDraft, Level, LoginCredentials, ModuleDraft, ProfileUpdate,
    RegisterCredentials, Role,
};
use portal_lib::{
    api::{courses, lessons, modules},
    config::Config,
    controllers::{
        CourseDetailController, CourseListController, CreateCourseController,
        DashboardController, EditCourseController, LessonDetailController,
        ModuleDetailController, View,
    },
    error::PortalError,
    state::AppState,
    store::NotificationKind,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

//=========================================================================================
// Command Line
//=========================================================================================

/// Console for the learning platform backend.
#[derive(Parser, Debug)]
#[command(name = "portal", version, about)]
struct Cli {
    /// Overrides PORTAL_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD")]
        password: String,
    },
    /// Create an account and sign in.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD")]
        password: String,
        #[arg(long, default_value = "student")]
        role: Role,
    },
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Update the signed-in user's profile.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    #[command(subcommand)]
    Courses(CourseCommand),
    #[command(subcommand)]
    Modules(ModuleCommand),
    #[command(subcommand)]
    Lessons(LessonCommand),
    #[command(subcommand)]
    Progress(ProgressCommand),
}

#[derive(Subcommand, Debug)]
enum CourseCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        sort_by: Option<String>,
    },
    /// Show a course with its modules.
    Show { id: String },
    Create(CourseFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: CourseFields,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct CourseFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    level: Option<Level>,
    /// Minutes.
    #[arg(long)]
    duration: Option<u32>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    instructor_name: Option<String>,
    #[arg(long)]
    thumbnail_url: Option<String>,
    #[arg(long)]
    published: Option<bool>,
}

impl CourseFields {
    fn apply(self, draft: &mut CourseDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(level) = self.level {
            draft.level = level;
        }
        if let Some(duration) = self.duration {
            draft.duration = duration;
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(published) = self.published {
            draft.is_published = published;
        }
        draft.category = self.category.or(draft.category.take());
        draft.instructor_name = self.instructor_name.or(draft.instructor_name.take());
        draft.thumbnail_url = self.thumbnail_url.or(draft.thumbnail_url.take());
    }
}

#[derive(Subcommand, Debug)]
enum ModuleCommand {
    List { course_id: String },
    /// Show a module with its lessons.
    Show { id: String },
    Create {
        course_id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        order: i32,
    },
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        order: Option<i32>,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum LessonCommand {
    List { module_id: String },
    Show { id: String },
    Create {
        module_id: String,
        #[command(flatten)]
        fields: LessonFields,
    },
    Update {
        id: String,
        #[command(flatten)]
        fields: LessonFields,
    },
    Delete { id: String },
}

#[derive(Args, Debug)]
struct LessonFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    content: Option<String>,
    #[arg(long)]
    video_url: Option<String>,
    #[arg(long)]
    duration: Option<u32>,
    #[arg(long)]
    order: Option<i32>,
}

impl LessonFields {
    fn apply(self, draft: &mut LessonDraft) {
        if let Some(title) = self.title {
            draft.title = title;
        }
        if let Some(description) = self.description {
            draft.description = description;
        }
        if let Some(duration) = self.duration {
            draft.duration = duration;
        }
        if let Some(order) = self.order {
            draft.order = order;
        }
        draft.content = self.content.or(draft.content.take());
        draft.video_url = self.video_url.or(draft.video_url.take());
    }
}

#[derive(Subcommand, Debug)]
enum ProgressCommand {
    /// Progress across enrolled courses.
    List,
    Show { course_id: String },
    /// Mark a lesson complete (or incomplete with --undo).
    Mark {
        course_id: String,
        lesson_id: String,
        #[arg(long)]
        undo: bool,
    },
}

//=========================================================================================
// Entry Point
//=========================================================================================

#[tokio::main]
async fn main() -> Result<(), PortalError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!("Configuration loaded: {:?}", config);

    // --- 2. Build the Shared AppState ---
    let state = AppState::from_config(config)?;
    let cancel = CancellationToken::new();
    let sweeper = state.spawn_cache_sweeper(cancel.clone());

    // --- 3. Validate Any Persisted Session ---
    if !matches!(cli.command, Command::Login { .. } | Command::Register { .. }) {
        state.auth().check_auth().await;
    }

    // --- 4. Run the Command ---
    let outcome = run(&state, cli.command).await;

    for notification in state.ui.snapshot().notifications {
        let label = match notification.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
        };
        eprintln!("[{}] {}", label, notification.message);
    }

    cancel.cancel();
    if let Err(e) = sweeper.await {
        debug!("Cache sweeper ended abnormally: {}", e);
    }
    info!("Done.");
    outcome
}

async fn run(state: &AppState, command: Command) -> Result<(), PortalError> {
    let api = state.api.clone();
    match command {
        Command::Login { email, password } => {
            let user = state.auth().login(&LoginCredentials { email, password }).await?;
            print_json(&user)
        }
        Command::Register {
            name,
            email,
            password,
            role,
        } => {
            let credentials = RegisterCredentials {
                name,
                email,
                password,
                role,
            };
            let user = state.auth().register(&credentials).await?;
            print_json(&user)
        }
        Command::Logout => {
            state.auth().logout().await;
            Ok(())
        }
        Command::Whoami => match state.session.user() {
            Some(user) => print_json(&user),
            None => Err(PortalError::Screen("Not logged in".to_string())),
        },
        Command::Profile { name, avatar_url } => {
            let user = state
                .auth()
                .update_profile(&ProfileUpdate { name, avatar_url })
                .await?;
            print_json(&user)
        }

        Command::Courses(CourseCommand::List {
            search,
            category,
            level,
            duration,
            sort_by,
        }) => {
            let filter = CourseFilter {
                search,
                category,
                level,
                duration,
                sort_by,
            };
            render(CourseListController::new(api, filter).ready().await)
        }
        Command::Courses(CourseCommand::Show { id }) => {
            let detail = CourseDetailController::load(api, id).await;
            let view = detail.view().clone();
            render(view.map(|course| {
                let mut course = course.as_ref().clone();
                course.modules = detail.modules().to_vec();
                course
            }))
        }
        Command::Courses(CourseCommand::Create(fields)) => {
            let mut draft = CreateCourseController::blank_form();
            fields.apply(&mut draft);
            if draft.title.trim().is_empty() {
                return Err(PortalError::Screen("A course needs a --title".to_string()));
            }
            let course = CreateCourseController::new(api).submit(&draft).await?;
            print_json(&course)
        }
        Command::Courses(CourseCommand::Update { id, fields }) => {
            let mut edit = EditCourseController::load(api, id).await;
            let mut draft = form_or_view(edit.form(), edit.view())?;
            fields.apply(&mut draft);
            let course = edit.submit(&draft).await?;
            print_json(&course)
        }
        Command::Courses(CourseCommand::Delete { id }) => {
            api.run(courses::delete(&id)).await?;
            println!("Deleted course {}", id);
            Ok(())
        }

        Command::Modules(ModuleCommand::List { course_id }) => {
            let list = api.fetch(modules::list(&course_id)).await;
            render(View::from_result(list, "Course not found"))
        }
        Command::Modules(ModuleCommand::Show { id }) => {
            let detail = ModuleDetailController::load(api, id).await;
            let view = detail.view().clone();
            render(view.map(|module| {
                let mut module = module.as_ref().clone();
                module.lessons = detail.lessons().to_vec();
                module
            }))
        }
        Command::Modules(ModuleCommand::Create {
            course_id,
            title,
            description,
            order,
        }) => {
            let mut detail = CourseDetailController::load(api, course_id).await;
            if let Some(message) = blocking_message(detail.view()) {
                return Err(PortalError::Screen(message));
            }
            let draft = ModuleDraft {
                title,
                description,
                order,
            };
            detail.create_module(&draft).await?;
            print_json(&detail.modules())
        }
        Command::Modules(ModuleCommand::Update {
            id,
            title,
            description,
            order,
        }) => {
            let mut detail = ModuleDetailController::load(api, id).await;
            let mut draft = form_or_view(detail.form(), detail.view())?;
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(order) = order {
                draft.order = order;
            }
            let module = detail.update(&draft).await?;
            print_json(&module)
        }
        Command::Modules(ModuleCommand::Delete { id }) => {
            api.run(modules::delete(&id)).await?;
            println!("Deleted module {}", id);
            Ok(())
        }

        Command::Lessons(LessonCommand::List { module_id }) => {
            let list = api.fetch(lessons::list(&module_id)).await;
            render(View::from_result(list, "Module not found"))
        }
        Command::Lessons(LessonCommand::Show { id }) => {
            render(LessonDetailController::load(api, id).await.view().clone())
        }
        Command::Lessons(LessonCommand::Create { module_id, fields }) => {
            let mut detail = ModuleDetailController::load(api, module_id).await;
            if let Some(message) = blocking_message(detail.view()) {
                return Err(PortalError::Screen(message));
            }
            let mut draft = LessonDraft {
                title: String::new(),
                description: String::new(),
                content: None,
                video_url: None,
                duration: 0,
                order: detail.lessons().iter().map(|l| l.order).max().unwrap_or(0) + 1,
            };
            fields.apply(&mut draft);
            if draft.title.trim().is_empty() {
                return Err(PortalError::Screen("A lesson needs a --title".to_string()));
            }
            let lesson = detail.create_lesson(&draft).await?;
            print_json(&lesson)
        }
        Command::Lessons(LessonCommand::Update { id, fields }) => {
            let mut detail = LessonDetailController::load(api, id).await;
            let mut draft = form_or_view(detail.form(), detail.view())?;
            fields.apply(&mut draft);
            let lesson = detail.update(&draft).await?;
            print_json(&lesson)
        }
        Command::Lessons(LessonCommand::Delete { id }) => {
            api.run(lessons::delete(&id)).await?;
            println!("Deleted lesson {}", id);
            Ok(())
        }

        Command::Progress(ProgressCommand::List) => {
            render(DashboardController::new(api).ready().await)
        }
        Command::Progress(ProgressCommand::Show { course_id }) => {
            render(DashboardController::new(api).course_progress(&course_id).await)
        }
        Command::Progress(ProgressCommand::Mark {
            course_id,
            lesson_id,
            undo,
        }) => {
            let dashboard = DashboardController::new(api);
            let recorded = dashboard.mark_lesson(&course_id, &lesson_id, !undo).await?;
            print_json(&recorded)
        }
    }
}

//=========================================================================================
// Output Helpers
//=========================================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), PortalError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn blocking_message<T>(view: &View<T>) -> Option<String> {
    match view {
        View::Content(_) => None,
        View::Loading => Some("Still loading".to_string()),
        View::Error(message) | View::NotFound(message) => Some(message.clone()),
    }
}

fn render<T: Serialize>(view: View<T>) -> Result<(), PortalError> {
    match view {
        View::Content(value) => print_json(&value),
        other => Err(PortalError::Screen(
            blocking_message(&other).unwrap_or_default(),
        )),
    }
}

fn form_or_view<D, T>(form: Option<D>, view: &View<T>) -> Result<D, PortalError> {
    form.ok_or_else(|| {
        PortalError::Screen(blocking_message(view).unwrap_or_else(|| "Nothing to edit".to_string()))
    })
}
