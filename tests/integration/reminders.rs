//! Reminder scheduling through the dialogue, fired on a simulated clock.

use crate::helpers::{CHAT, Harness, USER, t0};
use chrono::{Duration, NaiveDate};
use taskbot::task::NewTask;
use taskbot::{Priority, TaskId, TaskStore};

fn seed(h: &Harness, title: &str) -> TaskId {
    h.store
        .create(NewTask {
            owner: USER,
            title: title.to_owned(),
            priority: Priority::Normal,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        })
        .unwrap()
        .id
}

#[test]
fn five_hour_reminder_fires_once_at_the_deadline() {
    let mut h = Harness::new();
    seed(&h, "first");
    seed(&h, "second");
    let id = seed(&h, "Renew passport");
    assert_eq!(id, TaskId(3));

    assert_eq!(h.say("/remind"), ["Select a task to set a reminder:"]);
    assert_eq!(h.press("remind_select_3"), ["Select reminder period:"]);
    assert_eq!(
        h.press("remind_5_hours"),
        ["Reminder set for 5 hours from now."]
    );

    h.clock.advance(Duration::hours(5) - Duration::seconds(1));
    assert!(h.scheduler.fire_due().is_empty());
    assert!(h.delivered().is_empty());

    h.clock.advance(Duration::seconds(1));
    assert_eq!(h.scheduler.fire_due().len(), 1);
    let delivered = h.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].chat, CHAT);
    assert_eq!(delivered[0].text, "Reminder! Task: Renew passport");

    h.clock.advance(Duration::days(11));
    assert!(h.scheduler.fire_due().is_empty());
    assert!(h.delivered().is_empty());
}

#[test]
fn one_day_reminder_fires_at_t_plus_24h() {
    let mut h = Harness::new();
    let id = seed(&h, "Water plants");
    h.say("/remind");
    h.press(&format!("remind_select_{id}"));
    h.press("remind_1_day");

    let job = h.scheduler.pending().pop().unwrap();
    assert_eq!(job.fire_at, t0() + Duration::hours(24));

    h.clock.advance(Duration::hours(23));
    h.scheduler.fire_due();
    assert!(h.delivered().is_empty());

    h.clock.advance(Duration::hours(1));
    h.scheduler.fire_due();
    let texts: Vec<String> = h.delivered().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, ["Reminder! Task: Water plants"]);
}

#[test]
fn completing_a_task_keeps_its_reminder() {
    let mut h = Harness::new();
    let id = seed(&h, "Send invoice");
    h.say("/remind");
    h.press(&format!("remind_select_{id}"));
    h.press("remind_1_hour");
    h.press(&format!("mark_completed_{id}"));

    assert_eq!(h.say("/cancel"), ["Nothing to cancel."]);
    h.clock.advance(Duration::hours(1));
    h.scheduler.fire_due();
    assert_eq!(h.delivered()[0].text, "Reminder! Task: Send invoice");
}

#[test]
fn remind_lists_only_pending_tasks() {
    let mut h = Harness::new();
    assert_eq!(h.say("/remind"), ["No pending tasks found."]);

    let done = seed(&h, "done");
    h.press(&format!("mark_completed_{done}"));
    assert_eq!(h.say("/remind"), ["No pending tasks found."]);

    let open = seed(&h, "open");
    let out = h.router.handle(&taskbot::chat::InboundEvent::text(USER, CHAT, "/remind"));
    let payloads: Vec<&str> = out[0].keyboard.as_ref().unwrap().payloads().collect();
    assert_eq!(payloads, [format!("remind_select_{open}")]);
}

#[test]
fn period_without_a_selected_task_schedules_nothing() {
    let mut h = Harness::new();
    assert_eq!(
        h.press("remind_3_days"),
        ["Please choose a task with /remind first."]
    );
    assert!(h.scheduler.pending().is_empty());
}

#[test]
fn repeated_reminders_for_one_task_coexist() {
    let mut h = Harness::new();
    let id = seed(&h, "Stretch");
    for period in ["remind_1_hour", "remind_10_hours"] {
        h.say("/remind");
        h.press(&format!("remind_select_{id}"));
        h.press(period);
    }
    assert_eq!(h.scheduler.pending().len(), 2);

    h.clock.advance(Duration::hours(10));
    assert_eq!(h.scheduler.fire_due().len(), 2);
    assert_eq!(h.delivered().len(), 2);
}
