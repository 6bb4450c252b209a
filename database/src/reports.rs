use std::collections::{BTreeMap, HashMap};

use crate::{
    consts::consts::UNKNOWN_LABEL,
    model::{
        lead::Lead,
        report::{LeadReportRow, MonthlyCount, PrioritySummary, SourceSummary, StageSummary},
    },
};

/// Count and summed value per label
#[derive(Default)]
struct Group {
    count: u64,
    value: f64,
}

fn group_by<'a, F>(leads: &'a [Lead], label: F) -> Vec<(String, Group)>
where
    F: Fn(&'a Lead) -> Option<&'a str>,
{
    let mut groups: HashMap<String, Group> = HashMap::new();

    for lead in leads {
        let key = label(lead).unwrap_or(UNKNOWN_LABEL).to_string();
        let group = groups.entry(key).or_default();

        group.count += 1;
        group.value += lead.fields.value;
    }

    let mut groups: Vec<(String, Group)> = groups.into_iter().collect();

    // Biggest first, label breaks ties so output is stable
    groups.sort_by(|(a_label, a), (b_label, b)| b.count.cmp(&a.count).then_with(|| a_label.cmp(b_label)));

    groups
}

pub fn leads_by_source(leads: &[Lead]) -> Vec<SourceSummary> {
    group_by(leads, |lead| lead.fields.source.as_deref())
        .into_iter()
        .map(|(source, group)| SourceSummary {
            source,
            count: group.count,
            value: group.value,
        })
        .collect()
}

pub fn leads_by_priority(leads: &[Lead]) -> Vec<PrioritySummary> {
    group_by(leads, |lead| Some(lead.fields.priority.as_str()))
        .into_iter()
        .map(|(priority, group)| PrioritySummary {
            priority,
            count: group.count,
        })
        .collect()
}

pub fn pipeline_summary(leads: &[Lead]) -> Vec<StageSummary> {
    group_by(leads, |lead| Some(lead.fields.stage.as_str()))
        .into_iter()
        .map(|(stage, group)| StageSummary {
            stage,
            count: group.count,
            value: group.value,
        })
        .collect()
}

/// Leads created per calendar month (UTC), oldest month first
pub fn leads_trend(leads: &[Lead]) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<String, u64> = BTreeMap::new();

    for lead in leads {
        *months
            .entry(lead.fields.created_at.format("%Y-%m").to_string())
            .or_default() += 1;
    }

    months
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

/// Flat rows in the order given, callers pass leads newest first
pub fn lead_report(leads: &[Lead]) -> Vec<LeadReportRow> {
    leads
        .iter()
        .map(|lead| LeadReportRow {
            id: lead.id.to_string(),
            name: lead.fields.name.clone(),
            source: lead.fields.source.clone(),
            stage: lead.fields.stage.clone(),
            value: lead.fields.value,
            priority: lead.fields.priority.clone(),
            created_at: lead.fields.created_at.format("%Y-%m-%d").to_string(),
        })
        .collect()
}
