//! Demo data seeding.
//!
//! Creates an instructor, a student, two courses' worth of chat and the
//! course events that would normally notify them. Events are raised with the
//! suppress flag set unless `--notify` is given, so a fresh demo database
//! starts without a backlog of notifications.

use super::open_store;
use chrono::{Duration, Utc};
use clap::Args;
use coursehub_core::{Config, CourseRef, DomainEvent, RoomName, User, UserRef, Username};
use coursehub_gateway::events::{default_subscribers, event_bus};
use coursehub_gateway::{GroupRegistry, Notifier, PersistenceBridge};
use coursehub_store::Store;
use std::sync::Arc;
use tracing::info;

/// Seed command arguments.
#[derive(Args)]
pub struct SeedArgs {
    /// Delete existing chat messages and notifications first
    #[arg(long)]
    pub reset: bool,

    /// Deliver notifications for the seeded events
    #[arg(long)]
    pub notify: bool,
}

struct DemoCourse {
    id: &'static str,
    code: &'static str,
    title: &'static str,
    /// The student's opening chat message.
    greeting: &'static str,
}

const COURSES: &[DemoCourse] = &[
    DemoCourse {
        id: "1",
        code: "DS101",
        title: "Data Science Fundamentals",
        greeting: "Looking forward to digging into some real datasets!",
    },
    DemoCourse {
        id: "2",
        code: "ML201",
        title: "Machine Learning Applications",
        greeting: "Excited for this ML course!",
    },
];

const MATERIALS: &[&str] = &[
    "Lecture Slides - Week 1",
    "Assignment Guidelines",
    "Practical Dataset",
];

const DEADLINES: &[(&str, i64)] = &[
    ("Exploratory Data Quiz", 5),
    ("Model Deployment Milestone", 15),
];

/// What a seed run did.
#[derive(Debug, Default)]
pub struct SeedReport {
    /// Users created by this run.
    pub users_created: usize,

    /// Chat messages written.
    pub chat_messages: usize,

    /// Events handed to subscribers.
    pub events_delivered: usize,

    /// Events raised in total.
    pub events_raised: usize,

    /// Session tokens issued for the demo users.
    pub sessions: Vec<(Username, String)>,
}

async fn ensure_user(
    bridge: &PersistenceBridge,
    name: &str,
    full_name: &str,
    report: &mut SeedReport,
) -> anyhow::Result<User> {
    let username = Username::new(name)?;
    if let Some(user) = bridge.find_user(username.clone()).await? {
        return Ok(user);
    }

    let full_name = full_name.to_string();
    let user = bridge
        .run(move |store| store.create_user(&username, &full_name))
        .await?;
    report.users_created += 1;
    Ok(user)
}

fn demo_events(instructor: &User, student: &User) -> Vec<DomainEvent> {
    let author = UserRef {
        username: instructor.username.clone(),
        full_name: instructor.full_name.clone(),
    };
    let learner = UserRef {
        username: student.username.clone(),
        full_name: student.full_name.clone(),
    };
    let recipients = vec![student.username.clone()];

    let mut events = Vec::new();
    for course in COURSES {
        let course_ref = CourseRef {
            id: course.id.to_string(),
            title: course.title.to_string(),
        };

        events.push(DomainEvent::EnrollmentCreated {
            course: course_ref.clone(),
            student: learner.clone(),
            instructor: instructor.username.clone(),
        });

        for title in MATERIALS {
            events.push(DomainEvent::MaterialUploaded {
                course: course_ref.clone(),
                title: title.to_string(),
                recipients: recipients.clone(),
            });
        }

        for (title, days) in DEADLINES {
            events.push(DomainEvent::DeadlineCreated {
                course: course_ref.clone(),
                title: format!("{}: {}", course.code, title),
                due: Utc::now() + Duration::days(*days),
                instructor: author.clone(),
                recipients: recipients.clone(),
            });
        }
    }
    events
}

/// Seed the store with demo data.
pub async fn seed(store: Arc<dyn Store>, reset: bool, notify: bool) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();
    let bridge = PersistenceBridge::new(store);

    if reset {
        info!("Clearing chat messages and notifications");
        bridge.run(|store| store.clear_activity()).await?;
    }

    let instructor = ensure_user(&bridge, "prof_davis", "James Davis", &mut report).await?;
    let student = ensure_user(&bridge, "emma1", "Emma Brown", &mut report).await?;

    for course in COURSES {
        let room = RoomName::new(course.id)?;
        bridge
            .record_chat_message(room, student.id, course.greeting.to_string())
            .await?;
        report.chat_messages += 1;
    }

    let notifier = Notifier::new(bridge.clone(), Arc::new(GroupRegistry::new()));
    let (emitter, dispatcher) = event_bus(default_subscribers(&notifier));

    for event in demo_events(&instructor, &student) {
        report.events_raised += 1;
        if emitter.emit(event, !notify) {
            report.events_delivered += 1;
        }
    }

    // Drain everything queued above, then stop
    drop(emitter);
    dispatcher.run().await;

    for user in [&instructor, &student] {
        let user_id = user.id;
        let session = bridge
            .run(move |store| store.create_session(user_id, None))
            .await?;
        report.sessions.push((user.username.clone(), session.token));
    }

    Ok(report)
}

/// Run the seed command.
pub async fn run(args: SeedArgs, config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let report = seed(store, args.reset, args.notify).await?;

    println!(
        "Seeded {} new user(s), {} chat message(s), {} event(s) ({} delivered)",
        report.users_created, report.chat_messages, report.events_raised, report.events_delivered
    );
    for (username, token) in &report.sessions {
        println!("  {:<12} {}", username.as_str(), token);
    }

    Ok(())
}
