use std::collections::BTreeMap;

use serde::Serialize;

use quire_core::decisions::DecisionMap;
use quire_core::projection::ManuscriptView;
use quire_core::state::Comment;
use quire_core::state::Manuscript;
use quire_exec::contracts::Person;

pub fn print_table(views: &[ManuscriptView]) {
    if views.is_empty() {
        println!("no manuscripts");
        return;
    }
    println!("{:<12} {:<17} {:<8} TITLE", "ID", "STATE", "REVIEW");
    for view in views {
        let review = if view.review_complete {
            "complete"
        } else {
            "open"
        };
        println!(
            "{:<12} {:<17} {:<8} {}",
            view.id.as_str(),
            view.state.label(),
            review,
            view.title
        );
        if !view.awaiting.is_empty() {
            println!("{:<12} awaiting: {}", "", view.awaiting.join(", "));
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ManuscriptReport {
    pub id: String,
    pub title: String,
    pub state: String,
    pub history: Vec<String>,
    pub referees: Vec<String>,
    pub review_complete: bool,
    pub awaiting: Vec<String>,
    pub decisions: BTreeMap<String, String>,
    pub available: Vec<String>,
    pub comments: Vec<Comment>,
}

impl ManuscriptReport {
    pub fn new(manuscript: &Manuscript, view: &ManuscriptView, decisions: &DecisionMap) -> Self {
        Self {
            id: manuscript.id.to_string(),
            title: manuscript.title.clone(),
            state: manuscript.state.as_str().to_string(),
            history: manuscript
                .history
                .iter()
                .map(|state| state.as_str().to_string())
                .collect(),
            referees: manuscript.referees.clone(),
            review_complete: view.review_complete,
            awaiting: view.awaiting.clone(),
            decisions: decisions
                .get(&manuscript.id)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|(referee, decision)| (referee.clone(), decision.as_str().to_string()))
                        .collect()
                })
                .unwrap_or_default(),
            available: view
                .available
                .iter()
                .map(|decision| decision.as_str().to_string())
                .collect(),
            comments: view.comments.clone(),
        }
    }
}

pub fn print_report(report: &ManuscriptReport) {
    println!("{} ({})", report.title, report.id);
    println!("state:     {}", report.state);
    if !report.history.is_empty() {
        println!("history:   {}", report.history.join(" -> "));
    }
    println!(
        "referees:  {}",
        if report.referees.is_empty() {
            "none".to_string()
        } else {
            report.referees.join(", ")
        }
    );
    for (referee, decision) in &report.decisions {
        println!("  {referee}: {decision}");
    }
    println!(
        "review:    {}",
        if report.review_complete {
            "complete"
        } else {
            "open"
        }
    );
    if !report.available.is_empty() {
        println!("you can:   {}", report.available.join(", "));
    }
    if !report.comments.is_empty() {
        println!("comments:");
        for comment in &report.comments {
            println!("  [{}] {}: {}", comment.date, comment.author, comment.text);
        }
    }
}

pub fn print_people(people: &[Person]) {
    for person in people {
        let roles = person
            .roles
            .iter()
            .map(|role| role.as_str())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<12} {:<32} {}",
            person.id,
            person.email.as_deref().unwrap_or("-"),
            roles
        );
    }
}
