use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use fitlog_core::calendar::{logged_days, next_weekday, previous_weekday, CalendarMonth};
use fitlog_core::catalog::{get_default_catalog, parse_weekday};
use fitlog_core::export::export_history_csv;
use fitlog_core::insights::load_insights;
use fitlog_core::meals::{
    meals_for_day, read_meals, totals, MealDraft, MealField, MemoryMealSink,
};
use fitlog_core::progression::current_week;
use fitlog_core::session::GuestSessionProvider;
use fitlog_core::store::record_day_metrics;
use fitlog_core::*;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fitlog")]
#[command(about = "Personal workout, activity and meal tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a throwaway guest session; nothing is persisted
    #[arg(long, global = true)]
    guest: bool,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,

        /// Display name (defaults to the part of the email before '@')
        #[arg(long)]
        name: Option<String>,

        /// Stable user id (defaults to the lowercased email)
        #[arg(long)]
        user_id: Option<String>,

        /// First day of training (defaults to today)
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },

    /// Forget the signed-in session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Show the weekly training schedule
    Schedule {
        /// Only show one weekday (e.g. monday, fri)
        #[arg(long)]
        day: Option<String>,
    },

    /// Show or edit the workout log for a date (default)
    Log {
        /// Date to open (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[command(subcommand)]
        action: Option<LogAction>,
    },

    /// Record steps and workout completion for a date
    Metrics {
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        steps: Option<u32>,

        /// Whether the day's workout was completed (true/false)
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Show average steps, completion rate and longest streak
    Insights,

    /// Show the six-week progression plan
    Progress {
        /// Browse this many phases ahead of the current one
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show a month with logged days marked
    Calendar {
        /// Month to show as YYYY-MM (defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Show the month after
        #[arg(long, conflicts_with = "prev")]
        next: bool,

        /// Show the month before
        #[arg(long)]
        prev: bool,
    },

    /// Log and list meals
    Meal {
        #[command(subcommand)]
        action: MealAction,
    },

    /// Export daily metric history to CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Print the log
    Show,

    /// Set the reps for one set and save the whole day (positions are 1-based)
    Set {
        workout: usize,
        exercise: usize,
        set: usize,
        value: String,

        /// Apply the edit without saving
        #[arg(long)]
        dry_run: bool,
    },

    /// Save the day's log as it stands
    Save,
}

#[derive(Subcommand)]
enum MealAction {
    /// Add a meal
    Add {
        name: String,

        #[arg(long, default_value = "")]
        calories: String,

        /// Grams of protein
        #[arg(long, default_value = "")]
        protein: String,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List meals and totals for a date
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

/// Settings shared by every command
struct AppContext {
    config: Config,
    data_dir: PathBuf,
    today: NaiveDate,
    guest: bool,
}

/// The signed-in user together with their stores
struct Workspace {
    session: UserSession,
    store: Box<dyn RecordStore>,
    meals: Box<dyn MealSink>,
    meals_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    fitlog_core::logging::init_with_level(fitlog_core::logging::level_for_verbosity(
        cli.verbose,
    ));

    let config = Config::load()?;
    let app = AppContext {
        data_dir: cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone()),
        today: cli
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
        guest: cli.guest,
        config,
    };

    match cli.command {
        Some(Commands::Login {
            email,
            name,
            user_id,
            start_date,
        }) => cmd_login(&app, email, name, user_id, start_date),
        Some(Commands::Logout) => cmd_logout(&app),
        Some(Commands::Whoami) => cmd_whoami(&app),
        Some(Commands::Schedule { day }) => cmd_schedule(day),
        Some(Commands::Log { date, action }) => cmd_log(&app, date, action),
        Some(Commands::Metrics {
            date,
            steps,
            completed,
        }) => cmd_metrics(&app, date, steps, completed),
        Some(Commands::Insights) => cmd_insights(&app),
        Some(Commands::Progress { offset }) => cmd_progress(&app, offset),
        Some(Commands::Calendar { month, next, prev }) => cmd_calendar(&app, month, next, prev),
        Some(Commands::Meal { action }) => cmd_meal(&app, action),
        Some(Commands::Export { out }) => cmd_export(&app, out),
        None => cmd_log(&app, None, None),
    }
}

fn open_workspace(app: &AppContext) -> Result<Workspace> {
    if app.guest {
        let provider = GuestSessionProvider::new(app.today);
        let session = provider
            .current_session()?
            .ok_or_else(|| Error::Session("guest session unavailable".into()))?;
        return Ok(Workspace {
            session,
            store: Box::new(MemoryRecordStore::new()),
            meals: Box::new(MemoryMealSink::default()),
            meals_path: None,
        });
    }

    let provider = LocalSessionProvider::new(app.config.session_path(&app.data_dir));
    let session = provider.current_session()?.ok_or_else(|| {
        Error::Session(
            "not signed in (run `fitlog login --email <address>` or pass --guest)".into(),
        )
    })?;
    let meals_path = app.config.meals_path(&app.data_dir);

    Ok(Workspace {
        session,
        store: Box::new(JsonFileRecordStore::new(
            app.config.table_path(&app.data_dir),
        )),
        meals: Box::new(JsonlMealSink::new(meals_path.clone())),
        meals_path: Some(meals_path),
    })
}

fn cmd_login(
    app: &AppContext,
    email: String,
    name: Option<String>,
    user_id: Option<String>,
    start_date: Option<NaiveDate>,
) -> Result<()> {
    if app.guest {
        return Err(Error::Session("guest sessions cannot log in".into()));
    }

    let email = email.trim().to_string();
    let Some((local_part, _)) = email.split_once('@') else {
        return Err(Error::Session(format!("'{}' is not an email address", email)));
    };

    let session = UserSession {
        user_id: user_id.unwrap_or_else(|| email.to_lowercase()),
        display_name: name.unwrap_or_else(|| local_part.to_string()),
        email: email.clone(),
        training_start_date: start_date.unwrap_or(app.today),
        is_guest: false,
    };

    let mut provider = LocalSessionProvider::new(app.config.session_path(&app.data_dir));
    provider.on_session_change(Box::new(|s: Option<&UserSession>| {
        tracing::debug!("Session changed: {:?}", s.map(|s| &s.user_id));
    }));
    provider.sign_in(session.clone())?;

    println!("✓ Signed in as {} <{}>", session.display_name, session.email);
    println!("  Training started: {}", session.training_start_date);
    Ok(())
}

fn cmd_logout(app: &AppContext) -> Result<()> {
    if app.guest {
        println!("Guest sessions end with the process - nothing to sign out.");
        return Ok(());
    }

    let mut provider = LocalSessionProvider::new(app.config.session_path(&app.data_dir));
    provider.sign_out()?;
    println!("✓ Signed out");
    Ok(())
}

fn cmd_whoami(app: &AppContext) -> Result<()> {
    let session = if app.guest {
        GuestSessionProvider::new(app.today).current_session()?
    } else {
        LocalSessionProvider::new(app.config.session_path(&app.data_dir)).current_session()?
    };

    match session {
        Some(s) => {
            println!("{} <{}>", s.display_name, s.email);
            println!("  User id: {}", s.user_id);
            println!("  Training started: {}", s.training_start_date);
            if s.is_guest {
                println!("  Guest session (nothing is persisted)");
            }
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

fn cmd_schedule(day: Option<String>) -> Result<()> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    let filter = match day {
        Some(name) => Some(
            parse_weekday(&name)
                .ok_or_else(|| Error::Other(format!("Unknown weekday: {}", name)))?,
        ),
        None => None,
    };

    for def in &catalog.schedule {
        if filter.is_some_and(|d| d != def.day) {
            continue;
        }
        println!("{} - {}", def.day, def.title);
        if def.is_rest() {
            println!("  (rest)");
        }
        for spec in &def.exercises {
            println!("  • {}", spec.description);
        }
    }

    if let Some(day) = filter {
        println!();
        println!(
            "  ← {}   {} →",
            previous_weekday(day),
            next_weekday(day)
        );
    }
    Ok(())
}

fn cmd_log(app: &AppContext, date: Option<NaiveDate>, action: Option<LogAction>) -> Result<()> {
    let mut ws = open_workspace(app)?;
    let date = date.unwrap_or(app.today);
    let user_id = ws.session.user_id.clone();

    let mut state = WorkoutLogState::with_default_catalog();
    state.hydrate(&*ws.store, &user_id, date)?;

    match action.unwrap_or(LogAction::Show) {
        LogAction::Show => {}
        LogAction::Save => {
            report_save(state.save(&mut *ws.store, &user_id, date)?, &ws.session);
            println!();
        }
        LogAction::Set {
            workout,
            exercise,
            set,
            value,
            dry_run,
        } => {
            let stored = state.set_rep(
                date,
                position(workout, "workout")?,
                position(exercise, "exercise")?,
                position(set, "set")?,
                &value,
            )?;
            println!("✓ Set {} of exercise {} to {} reps", set, exercise, stored);

            if dry_run {
                println!("[Dry run - not saving]");
            } else {
                report_save(state.save(&mut *ws.store, &user_id, date)?, &ws.session);
            }
            println!();
        }
    }

    if let Some(log) = state.log(date) {
        display_log(log);
    }
    Ok(())
}

fn report_save(outcome: SaveOutcome, session: &UserSession) {
    match outcome {
        SaveOutcome::Inserted | SaveOutcome::Updated => println!("✓ Workout saved"),
        SaveOutcome::NothingToSave => println!("Nothing to save"),
    }
    if session.is_guest {
        println!("  (guest session: not persisted)");
    }
}

/// Convert a 1-based position from the command line to an index
fn position(value: usize, what: &str) -> Result<usize> {
    value
        .checked_sub(1)
        .ok_or_else(|| Error::Other(format!("{} positions start at 1", what)))
}

fn display_log(log: &DailyLog) {
    println!("{}'s Workout ({})", weekday_name(log.date), log.date);

    let has_exercises = log.workouts.iter().any(|w| !w.exercises.is_empty());
    if !has_exercises {
        println!("  Rest Day - No workouts scheduled.");
        return;
    }

    for (w, workout) in log.workouts.iter().enumerate() {
        println!("  {}. {}", w + 1, workout.title);
        for (e, exercise) in workout.exercises.iter().enumerate() {
            let sets: Vec<String> = exercise.sets.iter().map(|r| r.to_string()).collect();
            println!("     {}. {:<40} [{}]", e + 1, exercise.name, sets.join(", "));
        }
    }
    println!("  Total reps: {}", log.total_reps());
}

fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

fn cmd_metrics(
    app: &AppContext,
    date: Option<NaiveDate>,
    steps: Option<u32>,
    completed: Option<bool>,
) -> Result<()> {
    if steps.is_none() && completed.is_none() {
        return Err(Error::Other(
            "nothing to record (pass --steps and/or --completed)".into(),
        ));
    }

    let mut ws = open_workspace(app)?;
    let date = date.unwrap_or(app.today);
    record_day_metrics(&mut *ws.store, &ws.session.user_id, date, steps, completed)?;

    println!("✓ Recorded metrics for {}", date);
    if let Some(steps) = steps {
        println!("  Steps: {}", steps);
    }
    if let Some(completed) = completed {
        println!("  Workout completed: {}", if completed { "yes" } else { "no" });
    }
    Ok(())
}

fn cmd_insights(app: &AppContext) -> Result<()> {
    let ws = open_workspace(app)?;
    let view = load_insights(
        &*ws.store,
        &ws.session.user_id,
        app.today,
        app.config.insights.window_days,
    );

    println!("Insights");
    match view {
        InsightsView::Loading => println!("  Loading insights..."),
        InsightsView::Errored(message) => {
            return Err(Error::Fetch(message));
        }
        InsightsView::Empty => println!("  No insights data available."),
        InsightsView::Computed(stats) => {
            println!("  Avg. daily steps:      {}", stats.average_daily_steps);
            println!("  Workout completion:    {}%", stats.weekly_completion_rate);
            println!("  Longest streak:        {}", stats.longest_streak);
        }
    }
    Ok(())
}

fn cmd_progress(app: &AppContext, offset: usize) -> Result<()> {
    let ws = open_workspace(app)?;
    let week = current_week(ws.session.training_start_date, app.today, 0);
    let phase = ProgressionPhase::for_week(week).advance(offset);

    println!("Weekly Progress: {}", phase.title());
    println!("  Current program week: {}", week);
    println!("  {}", phase.focus());
    for goal in phase.goals() {
        println!("  • {}: {}", goal.exercise, goal.target);
    }
    Ok(())
}

fn cmd_calendar(app: &AppContext, month: Option<String>, next: bool, prev: bool) -> Result<()> {
    let ws = open_workspace(app)?;
    let mut month = match month {
        Some(s) => CalendarMonth::parse(&s)
            .ok_or_else(|| Error::Other(format!("Invalid month '{}', expected YYYY-MM", s)))?,
        None => CalendarMonth::containing(app.today),
    };
    if next {
        month = month.next();
    } else if prev {
        month = month.previous();
    }
    let logged = logged_days(&*ws.store, &ws.session.user_id, month)?;

    println!("{}", month.title());
    println!(" Sun  Mon  Tue  Wed  Thu  Fri  Sat");

    let mut line = "     ".repeat(month.leading_blanks() as usize);
    for day in month.days() {
        let today = if day == app.today { '>' } else { ' ' };
        let marker = if logged.contains(&day) { '*' } else { ' ' };
        line.push_str(&format!("{}{:>3}{}", today, day.day(), marker));
        if day.weekday() == chrono::Weekday::Sat {
            println!("{}", line.trim_end());
            line.clear();
        }
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }
    println!();
    println!("  * workout logged ({} days)   > today", logged.len());
    Ok(())
}

fn cmd_meal(app: &AppContext, action: MealAction) -> Result<()> {
    let mut ws = open_workspace(app)?;

    match action {
        MealAction::Add {
            name,
            calories,
            protein,
            date,
        } => {
            let mut draft = MealDraft::new();
            draft.set_field(MealField::Name, &name);
            if !draft.set_field(MealField::Calories, &calories) {
                return Err(Error::Other("calories must be a whole number".into()));
            }
            if !draft.set_field(MealField::Protein, &protein) {
                return Err(Error::Other("protein must be a whole number".into()));
            }
            let meal = draft.submit()?;

            let entry = MealEntry::new(ws.session.user_id.clone(), date.unwrap_or(app.today), meal);
            ws.meals.append(&entry)?;
            println!(
                "✓ Meal logged: {} ({} kcal, {}g protein)",
                entry.meal.name, entry.meal.calories, entry.meal.protein
            );
        }
        MealAction::List { date } => {
            let date = date.unwrap_or(app.today);
            let entries = match &ws.meals_path {
                Some(path) => read_meals(path)?,
                None => Vec::new(),
            };
            let todays = meals_for_day(&entries, &ws.session.user_id, date);

            println!("Meals for {}", date);
            if todays.is_empty() {
                println!("  No meals logged yet.");
                return Ok(());
            }
            for entry in &todays {
                println!(
                    "  • {} - Calories: {}, Protein: {}g",
                    entry.meal.name, entry.meal.calories, entry.meal.protein
                );
            }
            let sums = totals(&todays);
            println!(
                "  Total: {} meals, {} kcal, {}g protein",
                sums.meals, sums.calories, sums.protein
            );
        }
    }
    Ok(())
}

fn cmd_export(app: &AppContext, out: PathBuf) -> Result<()> {
    let ws = open_workspace(app)?;
    let count = export_history_csv(&*ws.store, &ws.session.user_id, &out)?;
    println!("✓ Exported {} days to {}", count, out.display());
    Ok(())
}
