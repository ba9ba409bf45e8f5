use crate::infra::{
    parse_date, seed_demo_staff, InMemoryLeaveRepository, InMemoryStaffRepository, LoggingMailer,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

use leavehub::error::AppError;
use leavehub::workflows::leave::{
    BalanceSummary, LeaveEdit, LeavePolicy, LeaveService, LeaveSubmission, LeaveType, Organization,
    UserId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// First day of the demo leave request (YYYY-MM-DD). Defaults to next week.
    #[arg(long, value_parser = parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Last day of the demo leave request (YYYY-MM-DD). Defaults to start + 4 days.
    #[arg(long, value_parser = parse_date)]
    pub(crate) end_date: Option<NaiveDate>,
    /// Count Saturdays and Sundays as chargeable leave days.
    #[arg(long)]
    pub(crate) weekends_chargeable: bool,
}

/// Scripted walkthrough of the request lifecycle against an in-memory
/// deployment: submit, approve, edit back to pending, re-approve, reject.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = args
        .start_date
        .unwrap_or_else(|| Local::now().date_naive() + Duration::days(7));
    let end = args.end_date.unwrap_or(start + Duration::days(4));

    let policy = LeavePolicy {
        weekend_counts_as_leave: args.weekends_chargeable,
        ..LeavePolicy::default()
    };

    let requests = Arc::new(InMemoryLeaveRepository::default());
    let staff = Arc::new(InMemoryStaffRepository::default());
    seed_demo_staff(&staff, LeavePolicy::default_allocations(&NoSettings));
    let service = LeaveService::new(
        requests,
        staff,
        Arc::new(LoggingMailer),
        policy,
        Organization::default(),
    );

    let employee = UserId(1);
    let reviewer = UserId(3);

    println!("Leave management demo");
    println!(
        "  chargeable days for {start}..{end}: {}",
        service.day_count(start, end)?
    );

    let id = service.submit(LeaveSubmission {
        user_id: employee,
        leave_type: "annual".to_string(),
        start_date: start,
        end_date: end,
        reason: "Conference travel".to_string(),
    })?;
    println!("\nSubmitted request {} (pending)", id.0);
    render_balance(&service.balance(employee)?);

    service.approve(id, reviewer)?;
    println!("\nApproved by user {}", reviewer.0);
    render_balance(&service.balance(employee)?);

    service.edit(
        id,
        employee,
        LeaveEdit {
            leave_type: "annual".to_string(),
            start_date: start,
            end_date: start + Duration::days(2),
            reason: "Conference shortened".to_string(),
        },
    )?;
    println!("\nEdited while approved: request returns to pending for re-approval");
    render_balance(&service.balance(employee)?);

    service.approve(id, reviewer)?;
    println!("\nRe-approved under the new dates");
    render_balance(&service.balance(employee)?);

    service.reject(id, reviewer, "Coverage shortfall that week".to_string())?;
    println!("\nRejected after approval: debited days return to the balance");
    render_balance(&service.balance(employee)?);

    let view = service.request(id)?;
    println!(
        "\nFinal state: {} {} / {} / {} day(s), status {}",
        view.first_name,
        view.last_name,
        view.request.leave_type.display_name(),
        view.request.total_days,
        view.request.status.label()
    );

    Ok(())
}

fn render_balance(summary: &BalanceSummary) {
    println!("  balance:");
    for leave_type in LeaveType::ALL {
        let bucket = summary.get(leave_type);
        println!(
            "    {:<10} {:>2} used / {:>2} total ({} remaining)",
            leave_type.label(),
            bucket.used,
            bucket.total,
            bucket.remaining
        );
    }
}

/// Empty settings source so the demo always runs on shipped defaults.
struct NoSettings;

impl leavehub::workflows::leave::PolicySource for NoSettings {
    fn get_bool(&self, _name: &str) -> Option<bool> {
        None
    }

    fn get_int(&self, _name: &str) -> Option<u32> {
        None
    }
}
