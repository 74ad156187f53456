//! Domain events raised by course actions.
//!
//! Each event knows which users it notifies and whether it also posts an
//! announcement into the course's chat room. The messaging layer turns these
//! into stored notifications, chat messages and broadcasts.

use super::identity::display_name;
use super::{NotificationKind, NotificationPayload, RoomName, Username};
use crate::error::NameError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Headline length used when an announcement has no title.
const HEADLINE_CHARS: usize = 30;

/// Reference to a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRef {
    /// Course id. Also names the course's chat room.
    pub id: String,

    /// Course title.
    pub title: String,
}

impl CourseRef {
    /// Chat room belonging to this course.
    pub fn room(&self) -> Result<RoomName, NameError> {
        RoomName::new(self.id.clone())
    }
}

/// Reference to a user, with the name shown in messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Username.
    pub username: Username,

    /// Full name (may be empty).
    #[serde(default)]
    pub full_name: String,
}

impl UserRef {
    /// Full name, or the username when no full name is set.
    pub fn display_name(&self) -> &str {
        display_name(&self.full_name, &self.username)
    }
}

/// A domain action that should notify users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A student enrolled in a course.
    EnrollmentCreated {
        course: CourseRef,
        student: UserRef,
        instructor: Username,
    },

    /// New course material was uploaded.
    MaterialUploaded {
        course: CourseRef,
        title: String,
        recipients: Vec<Username>,
    },

    /// An announcement was posted to a course.
    StatusPosted {
        course: CourseRef,
        author: UserRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        content: String,
        recipients: Vec<Username>,
    },

    /// A new assignment deadline was created.
    DeadlineCreated {
        course: CourseRef,
        title: String,
        due: DateTime<Utc>,
        instructor: UserRef,
        recipients: Vec<Username>,
    },
}

/// A chat message an event posts into its course room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Target room.
    pub room: RoomName,

    /// Posting user.
    pub author: Username,

    /// Message body.
    pub body: String,
}

impl DomainEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnrollmentCreated { .. } => "enrollment_created",
            Self::MaterialUploaded { .. } => "material_uploaded",
            Self::StatusPosted { .. } => "status_posted",
            Self::DeadlineCreated { .. } => "deadline_created",
        }
    }

    /// Course the event belongs to.
    pub fn course(&self) -> &CourseRef {
        match self {
            Self::EnrollmentCreated { course, .. }
            | Self::MaterialUploaded { course, .. }
            | Self::StatusPosted { course, .. }
            | Self::DeadlineCreated { course, .. } => course,
        }
    }

    /// The user the event is raised on behalf of, if it names one.
    ///
    /// Material uploads carry no acting user.
    pub fn actor(&self) -> Option<&UserRef> {
        match self {
            Self::EnrollmentCreated { student, .. } => Some(student),
            Self::StatusPosted { author, .. } => Some(author),
            Self::DeadlineCreated { instructor, .. } => Some(instructor),
            Self::MaterialUploaded { .. } => None,
        }
    }

    /// Mutable form of [`actor`](Self::actor).
    pub fn actor_mut(&mut self) -> Option<&mut UserRef> {
        match self {
            Self::EnrollmentCreated { student, .. } => Some(student),
            Self::StatusPosted { author, .. } => Some(author),
            Self::DeadlineCreated { instructor, .. } => Some(instructor),
            Self::MaterialUploaded { .. } => None,
        }
    }

    /// Notifications this event produces, one per recipient.
    pub fn notifications(&self) -> Vec<(Username, NotificationPayload)> {
        let course = self.course();
        let (kind, message, recipients): (_, _, Vec<Username>) = match self {
            Self::EnrollmentCreated {
                student, instructor, ..
            } => (
                NotificationKind::Enrollment,
                format!("{} has enrolled in {}", student.display_name(), course.title),
                vec![instructor.clone()],
            ),
            Self::MaterialUploaded {
                title, recipients, ..
            } => (
                NotificationKind::Material,
                format!("New material '{}' added to {}", title, course.title),
                recipients.clone(),
            ),
            Self::StatusPosted { recipients, .. } => (
                NotificationKind::General,
                format!(
                    "New announcement in {}: {}",
                    course.title,
                    self.headline().unwrap_or_default()
                ),
                recipients.clone(),
            ),
            Self::DeadlineCreated {
                title,
                due,
                recipients,
                ..
            } => (
                NotificationKind::Deadline,
                format!(
                    "NEW ASSIGNMENT: '{}' for {}. Due: {}",
                    title,
                    course.title,
                    format_due(due)
                ),
                recipients.clone(),
            ),
        };

        recipients
            .into_iter()
            .map(|user| {
                let payload =
                    NotificationPayload::new(kind, message.clone()).with_course(course.id.clone());
                (user, payload)
            })
            .collect()
    }

    /// Chat announcement posted to the course room, if this event has one.
    pub fn announcement(&self) -> Result<Option<Announcement>, NameError> {
        let (author, body) = match self {
            Self::StatusPosted { author, .. } => (
                author.username.clone(),
                format!("Announcement: {}", self.headline().unwrap_or_default()),
            ),
            Self::DeadlineCreated {
                title,
                due,
                instructor,
                ..
            } => (
                instructor.username.clone(),
                format!(
                    "NEW ASSIGNMENT POSTED: {}. Deadline: {}",
                    title,
                    format_due(due)
                ),
            ),
            _ => return Ok(None),
        };

        Ok(Some(Announcement {
            room: self.course().room()?,
            author,
            body,
        }))
    }

    /// Announcement headline: the title, or the content's opening characters.
    fn headline(&self) -> Option<String> {
        match self {
            Self::StatusPosted { title, content, .. } => Some(match title {
                Some(t) if !t.trim().is_empty() => t.clone(),
                _ => {
                    let opening: String = content.chars().take(HEADLINE_CHARS).collect();
                    format!("{}...", opening)
                }
            }),
            _ => None,
        }
    }
}

fn format_due(due: &DateTime<Utc>) -> String {
    due.format("%Y-%m-%d %H:%M UTC").to_string()
}
