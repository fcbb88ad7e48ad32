use crate::cli::{Cli, Command, Format};
use crate::core::balance::Balances;
use crate::core::currency::CurrencyCode;
use crate::core::member::{GroupName, MemberName};
use crate::core::transaction::{Leg, Transaction, TransactionId, TransactionKind};
use crate::engine::allocation::SplitRequest;
use crate::engine::settlement::SettlementPlan;
use crate::error::Error as LedgerError;
use crate::ledger::book::Ledger;
use crate::ledger::store::{GroupRecord, Store};
use serde::Serialize;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),

    #[error("cannot encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

impl DispatchError {
    /// 1 for rejected commands, 2 when the book or the terminal failed.
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::Ledger(e) if !e.is_store_failure() => 1,
            _ => 2,
        }
    }
}

pub type DispatchResult = Result<(), DispatchError>;

/// Execute one parsed command against `ledger`.
///
/// `currency` is used for groups created without `--currency`. A command
/// that names a group with `-g` makes it the selected group once it
/// succeeds.
pub fn run<S: Store, W: Write>(
    ledger: &mut Ledger<S>,
    cli: Cli,
    currency: &CurrencyCode,
    out: &mut W,
) -> DispatchResult {
    let format = cli.format;
    match cli.command {
        Command::Create {
            name,
            members,
            currency: code,
        } => {
            let currency = code.map(CurrencyCode::new).unwrap_or_else(|| currency.clone());
            let members: Vec<MemberName> = members.into_iter().map(MemberName::new).collect();
            let id = ledger.create_group(GroupName::new(&name), members.clone(), currency.clone())?;
            writeln!(
                out,
                "Created group {} ({}) with {} [{}]",
                name,
                currency,
                join(&members),
                id
            )?;
        }
        Command::Add { group, members } => {
            let record = target(ledger, group.as_deref())?;
            let members: Vec<MemberName> = members.into_iter().map(MemberName::new).collect();
            ledger.add_members(&record.name, members.clone())?;
            remember(ledger, group.as_deref(), &record)?;
            writeln!(out, "Added {} to {}", join(&members), record.name)?;
        }
        Command::Remove {
            group,
            force,
            members,
        } => {
            let record = target(ledger, group.as_deref())?;
            let members: Vec<MemberName> = members.into_iter().map(MemberName::new).collect();
            ledger.remove_members(&record.name, &members, force)?;
            remember(ledger, group.as_deref(), &record)?;
            writeln!(out, "Removed {} from {}", join(&members), record.name)?;
        }
        Command::DeleteGroup { group, yes } => {
            let name = GroupName::new(group);
            ledger.group(&name)?;
            if !yes {
                writeln!(
                    out,
                    "This deletes group {} and its whole log; it cannot be undone. Re-run with --yes to confirm.",
                    name
                )?;
                return Ok(());
            }
            ledger.delete_group(&name)?;
            writeln!(out, "Deleted group {}", name)?;
        }
        Command::Split {
            amount,
            name,
            group,
            from,
            to,
            balance_rest,
        } => {
            let record = target(ledger, group.as_deref())?;
            let request = SplitRequest {
                total: amount,
                from,
                to,
                balance_rest,
            };
            let recorded = ledger.split(&record.name, &request, name)?;
            for warning in &recorded.warnings {
                writeln!(out, "warning: {}", warning)?;
            }
            remember(ledger, group.as_deref(), &record)?;
            writeln!(out, "{}", describe(&recorded.transaction, &record.currency))?;
        }
        Command::Pay {
            amount,
            group,
            from,
            to,
        } => {
            let record = target(ledger, group.as_deref())?;
            let tx = ledger.pay(
                &record.name,
                MemberName::new(from),
                MemberName::new(to),
                amount,
            )?;
            remember(ledger, group.as_deref(), &record)?;
            writeln!(out, "{}", describe(&tx, &record.currency))?;
        }
        Command::Undo { group, id } => {
            let record = target(ledger, group.as_deref())?;
            let undone = ledger.undo(&record.name, id.map(TransactionId::new))?;
            if undone.kind() == TransactionKind::Create {
                writeln!(out, "Undone creation of {}; the group is gone", record.name)?;
            } else {
                remember(ledger, group.as_deref(), &record)?;
                writeln!(out, "Undone: {}", describe(&undone, &record.currency))?;
            }
        }
        Command::List { group, all } => {
            let records = targets(ledger, group.as_deref(), all)?;
            let mut reports = Vec::with_capacity(records.len());
            for record in records {
                let log = ledger.transactions(&record.name, true)?;
                reports.push((record, log));
            }
            match format {
                Format::Json => {
                    let logs: Vec<ListReport> = reports
                        .iter()
                        .map(|(record, log)| ListReport {
                            group: &record.name,
                            currency: &record.currency,
                            transactions: log,
                        })
                        .collect();
                    emit_json(out, &logs)?;
                }
                Format::Text => {
                    for (record, log) in &reports {
                        writeln!(out, "Log of {} ({})", record.name, record.currency)?;
                        for tx in log {
                            writeln!(out, "{}", describe(tx, &record.currency))?;
                        }
                        writeln!(out)?;
                    }
                }
            }
        }
        Command::Stat { group, all } => {
            let records = targets(ledger, group.as_deref(), all)?;
            let mut reports = Vec::with_capacity(records.len());
            for record in records {
                let balances = ledger.balances_of(&record.name)?;
                reports.push((record, balances));
            }
            match format {
                Format::Json => {
                    let stats: Vec<StatReport> = reports
                        .iter()
                        .map(|(record, balances)| StatReport {
                            group: &record.name,
                            currency: &record.currency,
                            balances,
                        })
                        .collect();
                    emit_json(out, &stats)?;
                }
                Format::Text => {
                    for (record, balances) in &reports {
                        write_stat(out, record, balances)?;
                    }
                }
            }
        }
        Command::Balance { group, dry_run } => {
            let record = target(ledger, group.as_deref())?;
            let plan = if dry_run {
                ledger.settlement_plan(&record.name)?
            } else {
                ledger.settle_up(&record.name)?
            };
            remember(ledger, group.as_deref(), &record)?;
            match format {
                Format::Json => emit_json(out, &plan)?,
                Format::Text => write_plan(out, &record, &plan, dry_run)?,
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ListReport<'a> {
    group: &'a GroupName,
    currency: &'a CurrencyCode,
    transactions: &'a [Transaction],
}

#[derive(Serialize)]
struct StatReport<'a> {
    group: &'a GroupName,
    currency: &'a CurrencyCode,
    balances: &'a Balances,
}

fn target<S: Store>(ledger: &Ledger<S>, group: Option<&str>) -> Result<GroupRecord, LedgerError> {
    let explicit = group.map(GroupName::new);
    ledger.resolve_group(explicit.as_ref())
}

fn targets<S: Store>(
    ledger: &Ledger<S>,
    group: Option<&str>,
    all: bool,
) -> Result<Vec<GroupRecord>, LedgerError> {
    if all {
        ledger.groups()
    } else {
        Ok(vec![target(ledger, group)?])
    }
}

/// Select the group if the command named it explicitly.
fn remember<S: Store>(
    ledger: &mut Ledger<S>,
    group: Option<&str>,
    record: &GroupRecord,
) -> Result<(), LedgerError> {
    if group.is_some() {
        ledger.select(&record.name)?;
    }
    Ok(())
}

fn join(members: &[MemberName]) -> String {
    members
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One log line, e.g.
/// `#2 2026-03-01 18:04 split 20.00€ "Rewe" from fred 14.00€, jenny 6.00€ to fred 6.67€, ...`
pub fn describe(tx: &Transaction, currency: &CurrencyCode) -> String {
    let legs = |leg: Leg| {
        tx.allocations()
            .iter()
            .filter(|a| a.leg == leg)
            .map(|a| format!("{} {}", a.member, currency.format(a.amount)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut line = format!(
        "{} {} {}",
        tx.id(),
        tx.recorded_at().format("%Y-%m-%d %H:%M"),
        tx.kind()
    );
    if !tx.allocations().is_empty() {
        line.push_str(&format!(" {}", currency.format(tx.total())));
    }
    if let Some(memo) = tx.memo() {
        line.push_str(&format!(" {:?}", memo));
    }
    if !tx.allocations().is_empty() {
        line.push_str(&format!(" from {} to {}", legs(Leg::From), legs(Leg::To)));
    }
    if !tx.is_active() {
        line.push_str(" (reversed)");
    }
    line
}

fn write_stat<W: Write>(out: &mut W, record: &GroupRecord, balances: &Balances) -> io::Result<()> {
    writeln!(out, "Balances of {} ({})", record.name, record.currency)?;
    for (member, balance) in balances.iter() {
        writeln!(out, "  {}: {}", member, record.currency.format(balance))?;
    }
    writeln!(out)
}

fn write_plan<W: Write>(
    out: &mut W,
    record: &GroupRecord,
    plan: &SettlementPlan,
    dry_run: bool,
) -> io::Result<()> {
    if plan.is_empty() {
        return writeln!(out, "{} is settled.", record.name);
    }
    writeln!(out, "Payments that settle {}:", record.name)?;
    for payment in plan.payments() {
        writeln!(
            out,
            "  {} pays {} {}",
            payment.from,
            payment.to,
            record.currency.format(payment.amount)
        )?;
    }
    if dry_run {
        writeln!(out, "Dry run, nothing recorded.")
    } else {
        writeln!(out, "Recorded {} settlement transactions.", plan.len())
    }
}

fn emit_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> DispatchResult {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
