//! End-to-end dialogue scenarios through the command router.

use crate::helpers::{Harness, USER};
use chrono::{Datelike, NaiveDate};
use taskbot::dialog::DialogStage;
use taskbot::{Priority, TaskStatus, TaskStore};

/// Walk the whole creation dialogue, checking every reply.
fn create_task(h: &mut Harness, title: &str, priority: Priority, date: NaiveDate) {
    let (year, month, day) = (date.year(), date.month(), date.day());
    assert_eq!(h.say("/newtask"), ["Please send me the task title."]);
    assert_eq!(h.say(title), ["Select the task priority:"]);
    assert_eq!(
        h.press(&format!("priority_{}", priority.as_str())),
        [format!("Priority set to {priority}"), "Select year".to_owned()]
    );
    assert_eq!(h.pick(&format!("y_set_{year}_1_1")), ["Select month"]);
    assert_eq!(h.pick(&format!("m_set_{year}_{month}_1")), ["Select day"]);
    assert_eq!(
        h.pick(&format!("d_set_{year}_{month}_{day}")),
        [format!("Date set to {}", date.format("%Y-%m-%d")), "Task added!".to_owned()]
    );
}

fn create_buy_milk(h: &mut Harness) {
    create_task(
        h,
        "Buy milk",
        Priority::High,
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    );
}

#[test]
fn buy_milk_is_persisted_with_every_field() {
    let mut h = Harness::new();
    create_buy_milk(&mut h);

    let tasks = h.store.list_by_owner(USER, None).unwrap();
    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.title, "Buy milk");
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(h.router.engine().stage(USER), DialogStage::Idle);
}

#[test]
fn every_priority_and_date_is_stored_as_chosen() {
    let dates = [
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
    ];
    for priority in Priority::ALL {
        for date in dates {
            let mut h = Harness::new();
            let title = format!("Task {priority} {date}");
            create_task(&mut h, &title, priority, date);

            let tasks = h.store.list_by_owner(USER, None).unwrap();
            assert_eq!(tasks.len(), 1, "{priority} {date}");
            assert_eq!(tasks[0].title, title);
            assert_eq!(tasks[0].priority, priority);
            assert_eq!(tasks[0].date, date);
            assert_eq!(tasks[0].status, TaskStatus::Pending);
        }
    }
}

#[test]
fn replaying_the_final_date_creates_nothing_more() {
    let mut h = Harness::new();
    h.say("/newtask");
    h.say("Buy milk");
    h.press("priority_high");
    let final_token = h.picker_token("d_set_2024_3_1");
    assert_eq!(h.press(&final_token), ["Date set to 2024-03-01", "Task added!"]);

    for _ in 0..3 {
        assert_eq!(
            h.press(&final_token),
            ["This date picker is no longer active."]
        );
    }
    assert_eq!(h.store.list_by_owner(USER, None).unwrap().len(), 1);
}

#[test]
fn cancel_from_any_stage_returns_to_idle_without_writes() {
    let steps: [fn(&mut Harness); 3] = [
        |h| {
            h.say("/newtask");
        },
        |h| {
            h.say("/newtask");
            h.say("Buy milk");
        },
        |h| {
            h.say("/newtask");
            h.say("Buy milk");
            h.press("priority_low");
            h.pick("y_set_2025_1_1");
        },
    ];
    for step in steps {
        let mut h = Harness::new();
        step(&mut h);
        assert_ne!(h.router.engine().stage(USER), DialogStage::Idle);
        assert_eq!(h.say("/cancel"), ["Task creation canceled."]);
        assert_eq!(h.router.engine().stage(USER), DialogStage::Idle);
        assert!(h.store.list_by_owner(USER, None).unwrap().is_empty());
    }
}

#[test]
fn edits_from_the_task_list() {
    let mut h = Harness::new();
    create_buy_milk(&mut h);
    let id = h.store.list_by_owner(USER, None).unwrap()[0].id;

    let listing = h.say("/tasks");
    assert_eq!(
        listing,
        [format!(
            "{id}. Buy milk - Priority: high, Date: 2024-03-01, Status: pending"
        )]
    );

    h.press(&format!("change_priority_{id}"));
    assert_eq!(
        h.press(&format!("set_priority_normal_{id}")),
        [format!("Priority of task {id} set to normal.")]
    );

    assert_eq!(h.press(&format!("change_date_{id}")), ["Select year"]);
    assert_eq!(h.pick("d_go_2024_5_1"), ["Select day"]);
    assert_eq!(
        h.pick("d_set_2024_5_20"),
        [format!("Date of task {id} set to 2024-05-20.")]
    );

    assert_eq!(
        h.press(&format!("mark_completed_{id}")),
        [format!("Task {id} marked as completed.")]
    );
    assert_eq!(
        h.press(&format!("mark_completed_{id}")),
        [format!("Task {id} marked as completed.")]
    );

    let task = h.store.get_by_id(USER, id).unwrap().unwrap();
    assert_eq!(task.priority, Priority::Normal);
    assert_eq!(task.date, NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(h.store.list_by_owner(USER, None).unwrap().len(), 1);
}

#[test]
fn old_date_edit_picker_does_not_date_a_new_task() {
    let mut h = Harness::new();
    create_buy_milk(&mut h);
    let id = h.store.list_by_owner(USER, None).unwrap()[0].id;

    h.press(&format!("change_date_{id}"));
    let old_token = h.picker_token("d_set_2030_6_6");
    h.say("/newtask");
    h.say("Buy bread");
    h.press("priority_low");

    assert_eq!(
        h.press(&old_token),
        ["This date picker is no longer active."]
    );
    assert_eq!(
        h.router.engine().stage(USER),
        DialogStage::AwaitingDate
    );
    assert_eq!(
        h.pick("d_set_2024_4_4"),
        ["Date set to 2024-04-04", "Task added!"]
    );

    let tasks = h.store.list_by_owner(USER, None).unwrap();
    assert_eq!(tasks.len(), 2);
    let milk = h.store.get_by_id(USER, id).unwrap().unwrap();
    assert_eq!(milk.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let bread = tasks.iter().find(|t| t.title == "Buy bread").unwrap();
    assert_eq!(bread.date, NaiveDate::from_ymd_opt(2024, 4, 4).unwrap());
}

#[test]
fn newtask_mid_dialogue_restarts_from_the_title() {
    let mut h = Harness::new();
    h.say("/newtask");
    h.say("First title");
    assert_eq!(
        h.say("/newtask"),
        [
            "Your previous dialogue was discarded.",
            "Please send me the task title."
        ]
    );
    h.say("Second title");
    h.press("priority_normal");
    h.pick("d_set_2024_6_1");

    let tasks = h.store.list_by_owner(USER, None).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Second title");
}

#[test]
fn stray_buttons_do_not_disturb_a_dialogue() {
    let mut h = Harness::new();
    h.say("/newtask");
    h.say("Buy milk");

    assert_eq!(h.press("bogus_payload"), ["Sorry, that action was not found."]);
    assert_eq!(
        h.press("cal_1_d_set_2024_3_1"),
        ["This date picker is no longer active."]
    );
    assert_eq!(h.say("more text"), ["Please use the buttons above."]);
    assert_eq!(
        h.router.engine().stage(USER),
        DialogStage::AwaitingPriority
    );
}
