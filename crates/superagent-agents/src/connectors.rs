//! Mock enterprise connectors.
//!
//! Every connector serves a fixed, deterministic dataset so that runs of the
//! same workflow produce the same output. Outbound connectors (mail, chat)
//! do not deliver anything; they echo back what would have been sent.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

// ── CRM (Salesforce) ───────────────────────────────────────────

/// (id, account, amount, stage, close_date, owner, owner_email)
const OPPORTUNITIES: &[(&str, &str, u64, &str, &str, &str, &str)] = &[
    ("opp_001", "Acme Corporation", 250_000, "Negotiation", "2025-11-14", "Sarah Johnson", "sarah.johnson@example.com"),
    ("opp_002", "TechVentures Inc", 85_000, "Qualification", "2025-10-03", "Mike Chen", "mike.chen@example.com"),
    ("opp_003", "Global Industries", 480_000, "Value Proposition", "2025-12-19", "Emma Wilson", "emma.wilson@example.com"),
    ("opp_004", "Innovation Labs", 120_000, "Prospecting", "2025-02-21", "David Brown", "david.brown@example.com"),
    ("opp_005", "Enterprise Solutions", 730_000, "Needs Analysis", "2025-05-30", "Sarah Johnson", "sarah.johnson@example.com"),
    ("opp_006", "FutureTech Co", 64_000, "Negotiation", "2025-08-08", "Mike Chen", "mike.chen@example.com"),
    ("opp_007", "Digital Dynamics", 310_000, "Qualification", "2025-10-27", "Emma Wilson", "emma.wilson@example.com"),
    ("opp_008", "CloudScale Systems", 95_000, "Prospecting", "2025-03-12", "David Brown", "david.brown@example.com"),
    ("opp_009", "DataDrive Inc", 150_000, "Value Proposition", "2025-07-17", "Sarah Johnson", "sarah.johnson@example.com"),
    ("opp_010", "SmartBiz Solutions", 540_000, "Negotiation", "2025-12-05", "Mike Chen", "mike.chen@example.com"),
];

const ACCOUNTS: &[(&str, &str, &str, u64)] = &[
    ("acc_001", "Acme Corporation", "Technology", 50_000_000),
    ("acc_002", "TechVentures Inc", "Software", 12_000_000),
    ("acc_003", "Global Industries", "Manufacturing", 240_000_000),
    ("acc_004", "Innovation Labs", "Research", 8_500_000),
];

const CONTACTS: &[(&str, &str, &str, &str, &str)] = &[
    ("con_001", "Jordan", "Lee", "jordan.lee@acme.example", "acc_001"),
    ("con_002", "Priya", "Patel", "priya.patel@techventures.example", "acc_002"),
    ("con_003", "Alex", "Morgan", "alex.morgan@global.example", "acc_003"),
    ("con_004", "Sam", "Rivera", "sam.rivera@innovation.example", "acc_004"),
];

#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
    pub amount_min: Option<u64>,
    /// "Q1".."Q4"; `None` matches every quarter.
    pub close_quarter: Option<String>,
    pub stage: Option<String>,
}

fn quarter_of(date: &str) -> Option<&'static str> {
    let month: u32 = date.get(5..7)?.parse().ok()?;
    Some(match month {
        1..=3 => "Q1",
        4..=6 => "Q2",
        7..=9 => "Q3",
        10..=12 => "Q4",
        _ => return None,
    })
}

pub fn crm_opportunities(filter: &OpportunityFilter) -> Vec<Value> {
    OPPORTUNITIES
        .iter()
        .filter(|(_, _, amount, stage, close, _, _)| {
            filter.amount_min.map_or(true, |min| *amount >= min)
                && filter
                    .close_quarter
                    .as_deref()
                    .map_or(true, |q| quarter_of(close) == Some(q))
                && filter.stage.as_deref().map_or(true, |s| s == *stage)
        })
        .map(|(id, account, amount, stage, close, owner, email)| {
            json!({
                "Id": id,
                "Name": format!("{account} - Enterprise License"),
                "Account": { "Name": account },
                "Amount": amount,
                "StageName": stage,
                "CloseDate": close,
                "OwnerName": owner,
                "OwnerEmail": email,
            })
        })
        .collect()
}

pub fn crm_accounts() -> Vec<Value> {
    ACCOUNTS
        .iter()
        .map(|(id, name, industry, revenue)| {
            json!({ "Id": id, "Name": name, "Industry": industry, "AnnualRevenue": revenue })
        })
        .collect()
}

pub fn crm_contacts() -> Vec<Value> {
    CONTACTS
        .iter()
        .map(|(id, first, last, email, account)| {
            json!({
                "Id": id,
                "Name": format!("{first} {last}"),
                "Email": email,
                "AccountId": account,
            })
        })
        .collect()
}

// ── Ticketing (Jira) ───────────────────────────────────────────

/// (key, project, type, status, sprint, summary, points, assignee)
const ISSUES: &[(&str, &str, &str, &str, &str, &str, u64, &str)] = &[
    ("ENG-101", "ENG", "Bug", "In Progress", "Sprint 14", "Login fails on SSO redirect", 3, "Mike Chen"),
    ("ENG-102", "ENG", "Story", "To Do", "Sprint 14", "Bulk export of opportunities", 8, "Emma Wilson"),
    ("ENG-103", "ENG", "Task", "Done", "Sprint 13", "Upgrade database driver", 2, "David Brown"),
    ("ENG-104", "ENG", "Bug", "To Do", "Sprint 14", "Timezone drift in reports", 5, "Mike Chen"),
    ("OPS-201", "OPS", "Task", "In Progress", "Sprint 7", "Rotate API credentials", 1, "Sarah Johnson"),
    ("OPS-202", "OPS", "Incident", "Done", "Sprint 7", "Queue backlog on Monday", 3, "David Brown"),
];

#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub project_key: Option<String>,
    pub issue_type: Option<String>,
    pub status: Option<String>,
    pub sprint: Option<String>,
}

pub fn ticket_issues(filter: &IssueFilter) -> Vec<Value> {
    let eq = |want: &Option<String>, have: &str| want.as_deref().map_or(true, |w| w == have);
    ISSUES
        .iter()
        .filter(|(_, project, kind, status, sprint, _, _, _)| {
            eq(&filter.project_key, *project)
                && eq(&filter.issue_type, *kind)
                && eq(&filter.status, *status)
                && eq(&filter.sprint, *sprint)
        })
        .map(|(key, project, kind, status, sprint, summary, points, assignee)| {
            json!({
                "key": key,
                "project": project,
                "issue_type": kind,
                "status": status,
                "sprint": sprint,
                "summary": summary,
                "story_points": points,
                "assignee": assignee,
            })
        })
        .collect()
}

// ── Support (Zendesk) ──────────────────────────────────────────

/// (id, subject, status, priority, requester, requester_email)
const TICKETS: &[(u64, &str, &str, &str, &str, &str)] = &[
    (5001, "Cannot reset password", "open", "high", "Jordan Lee", "jordan.lee@acme.example"),
    (5002, "Invoice shows wrong currency", "pending", "normal", "Priya Patel", "priya.patel@techventures.example"),
    (5003, "Export times out", "open", "urgent", "Alex Morgan", "alex.morgan@global.example"),
    (5004, "Feature request: dark mode", "solved", "low", "Sam Rivera", "sam.rivera@innovation.example"),
    (5005, "SSO login loop", "open", "normal", "Jordan Lee", "jordan.lee@acme.example"),
];

pub fn support_tickets(status: Option<&str>, priority: Option<&str>) -> Vec<Value> {
    TICKETS
        .iter()
        .filter(|(_, _, s, p, _, _)| {
            status.map_or(true, |want| want == *s) && priority.map_or(true, |want| want == *p)
        })
        .map(|(id, subject, s, p, requester, email)| {
            json!({
                "id": id,
                "subject": subject,
                "status": s,
                "priority": p,
                "name": requester,
                "email": email,
            })
        })
        .collect()
}

// ── Marketing CRM (HubSpot) ────────────────────────────────────

/// (id, first, last, email, lifecycle_stage, lead_score)
const HUBSPOT_CONTACTS: &[(&str, &str, &str, &str, &str, u64)] = &[
    ("hs_001", "Taylor", "Brooks", "taylor.brooks@example.com", "lead", 42),
    ("hs_002", "Casey", "Nguyen", "casey.nguyen@example.com", "marketingqualifiedlead", 71),
    ("hs_003", "Robin", "Schmidt", "robin.schmidt@example.com", "salesqualifiedlead", 88),
    ("hs_004", "Jamie", "Okafor", "jamie.okafor@example.com", "customer", 95),
    ("hs_005", "Drew", "Kowalski", "drew.kowalski@example.com", "lead", 18),
];

pub fn marketing_contacts(lifecycle_stage: Option<&str>, min_score: u64) -> Vec<Value> {
    HUBSPOT_CONTACTS
        .iter()
        .filter(|(_, _, _, _, stage, score)| {
            lifecycle_stage.map_or(true, |want| want == *stage) && *score >= min_score
        })
        .map(|(id, first, last, email, stage, score)| {
            json!({
                "id": id,
                "firstname": first,
                "lastname": last,
                "email": email,
                "lifecycle_stage": stage,
                "lead_score": score,
            })
        })
        .collect()
}

// ── IT service management (ServiceNow) ─────────────────────────

/// (number, table, short_description, priority, state, assigned_to, opened_at)
const SN_RECORDS: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    ("INC0010234", "incident", "VPN connection dropping for remote staff", "High", "In Progress", "Network Team", "2025-10-02"),
    ("INC0010235", "incident", "Email sync failing on mobile clients", "Medium", "Open", "Messaging Team", "2025-10-03"),
    ("INC0010236", "incident", "Primary database CPU saturation", "Critical", "In Progress", "DBA Team", "2025-10-03"),
    ("INC0010237", "incident", "Printer offline on floor 3", "Low", "Open", "Desktop Support", "2025-10-04"),
    ("CHG0030112", "change_request", "Upgrade load balancer firmware", "Medium", "Open", "Network Team", "2025-10-01"),
    ("PRB0040021", "problem", "Recurring VPN tunnel resets", "High", "Open", "Network Team", "2025-09-28"),
];

#[derive(Debug, Clone, Default)]
pub struct ServiceRecordFilter {
    pub table: String,
    pub priority: Option<String>,
    pub state: Option<String>,
    pub assigned_to: Option<String>,
}

pub fn service_records(filter: &ServiceRecordFilter) -> Vec<Value> {
    let eq = |want: &Option<String>, have: &str| want.as_deref().map_or(true, |w| w == have);
    SN_RECORDS
        .iter()
        .filter(|(_, table, _, priority, state, assigned, _)| {
            *table == filter.table
                && eq(&filter.priority, *priority)
                && eq(&filter.state, *state)
                && eq(&filter.assigned_to, *assigned)
        })
        .map(|(number, table, desc, priority, state, assigned, opened)| {
            json!({
                "number": number,
                "table": table,
                "short_description": desc,
                "priority": priority,
                "state": state,
                "assigned_to": assigned,
                "opened_at": opened,
            })
        })
        .collect()
}

// ── ERP (SAP) ──────────────────────────────────────────────────

/// (document, vendor, amount, status, posting_date)
const PURCHASE_ORDERS: &[(&str, &str, u64, &str, &str)] = &[
    ("PO-2025-001", "Acme Supplies Inc", 125_000, "approved", "2025-09-15"),
    ("PO-2025-002", "Globex Materials", 87_500, "approved", "2025-09-18"),
    ("PO-2025-003", "Initech Hardware", 65_000, "approved", "2025-09-22"),
    ("PO-2025-004", "Umbrella Tech", 92_000, "pending", "2025-09-25"),
    ("PO-2025-005", "Stark Components", 145_000, "approved", "2025-09-30"),
];

const VENDOR_INVOICES: &[(&str, &str, u64, &str, &str)] = &[
    ("INV-45678", "Initech Solutions", 50_000, "approved", "2025-09-20"),
    ("INV-45679", "Acme Corp", 72_000, "pending", "2025-09-24"),
    ("INV-45680", "Globex Industries", 38_000, "approved", "2025-09-29"),
];

/// `query_type` is `purchase_orders` or `vendor_invoices`; any other type
/// has no documents. Status matching ignores case.
pub fn erp_documents(query_type: &str, status: Option<&str>, company_code: Option<&str>) -> Vec<Value> {
    let (rows, id_key) = match query_type {
        "purchase_orders" => (PURCHASE_ORDERS, "po_number"),
        "vendor_invoices" => (VENDOR_INVOICES, "invoice_number"),
        _ => return Vec::new(),
    };
    let company = company_code.unwrap_or("1000");
    rows.iter()
        .filter(|(_, _, _, s, _)| status.map_or(true, |want| want.eq_ignore_ascii_case(s)))
        .map(|(doc, vendor, amount, s, date)| {
            json!({
                id_key: doc,
                "vendor": vendor,
                "vendor_email": format!("ap@{}.example", vendor.split(' ').next().unwrap_or(vendor).to_lowercase()),
                "amount": amount,
                "currency": "USD",
                "status": s,
                "posting_date": date,
                "company_code": company,
            })
        })
        .collect()
}

// ── HR (Workday, Darwinbox) ────────────────────────────────────

/// (id, first, last, department, title, performance_rating, manager_id)
const EMPLOYEES: &[(&str, &str, &str, &str, &str, &str, Option<&str>)] = &[
    ("emp_0001", "Olivia", "Martin", "Executive", "CEO", "Outstanding", None),
    ("emp_0002", "Noah", "Garcia", "Engineering", "Engineering Manager", "Exceeds Expectations", Some("emp_0001")),
    ("emp_0003", "Ava", "Thompson", "Engineering", "Senior Software Engineer", "Outstanding", Some("emp_0002")),
    ("emp_0004", "Liam", "Robinson", "Engineering", "Software Engineer", "Meets Expectations", Some("emp_0002")),
    ("emp_0005", "Mia", "Clark", "Sales", "Account Executive", "Exceeds Expectations", Some("emp_0001")),
    ("emp_0006", "Ethan", "Lewis", "Sales", "Sales Development Rep", "Meets Expectations", Some("emp_0005")),
    ("emp_0007", "Sophia", "Walker", "Marketing", "Marketing Manager", "Outstanding", Some("emp_0001")),
    ("emp_0008", "Lucas", "Hall", "Product", "Product Manager", "Exceeds Expectations", Some("emp_0001")),
    ("emp_0009", "Isabella", "Young", "Engineering", "Tech Lead", "Exceeds Expectations", Some("emp_0002")),
    ("emp_0010", "Mason", "King", "Customer Success", "Customer Success Manager", "Needs Improvement", Some("emp_0001")),
];

#[derive(Debug, Clone, Default)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub performance_rating: Option<String>,
    pub manager_id: Option<String>,
}

fn employee_json(row: &(&str, &str, &str, &str, &str, &str, Option<&str>)) -> Value {
    let (id, first, last, department, title, rating, manager) = row;
    json!({
        "employee_id": id,
        "first_name": first,
        "last_name": last,
        "name": format!("{first} {last}"),
        "email": format!("{}.{}@company.example", first.to_lowercase(), last.to_lowercase()),
        "department": department,
        "title": title,
        "performance_rating": rating,
        "manager_id": manager,
        "employment_status": "Active",
    })
}

pub fn hr_employees(filter: &EmployeeFilter) -> Vec<Value> {
    let eq = |want: &Option<String>, have: &str| want.as_deref().map_or(true, |w| w == have);
    EMPLOYEES
        .iter()
        .filter(|(_, _, _, department, _, rating, manager)| {
            eq(&filter.department, *department)
                && eq(&filter.performance_rating, *rating)
                && filter
                    .manager_id
                    .as_deref()
                    .map_or(true, |m| *manager == Some(m))
        })
        .map(employee_json)
        .collect()
}

pub fn hr_employee(employee_id: &str) -> Option<Value> {
    EMPLOYEES
        .iter()
        .find(|row| row.0 == employee_id)
        .map(employee_json)
}

/// (leave_type, annual entitlement in days)
const LEAVE_TYPES: &[(&str, u32)] = &[("annual", 20), ("sick", 10), ("casual", 6)];

/// Leave balances; `used` is derived from the employee number.
pub fn hr_leave_balances(employee_id: &str) -> Option<Vec<Value>> {
    hr_employee(employee_id)?;
    let seed: u32 = employee_id
        .trim_start_matches("emp_")
        .parse()
        .unwrap_or(0);
    Some(
        LEAVE_TYPES
            .iter()
            .enumerate()
            .map(|(i, (kind, total))| {
                let used = (seed + i as u32 * 3) % (total / 2);
                json!({
                    "leave_type": kind,
                    "total_days": total,
                    "used_days": used,
                    "available_days": total - used,
                })
            })
            .collect(),
    )
}

// ── Outbound (Outlook, Slack) ──────────────────────────────────

/// Receipt for a message handed to a mock outbound connector.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
}

/// Message ids are derived from the execution and sequence number.
pub fn deliver(prefix: &str, execution_id: &str, seq: usize) -> Delivery {
    Delivery {
        message_id: format!("{prefix}_{execution_id}_{seq:03}"),
        sent_at: Utc::now(),
    }
}

pub const SLACK_CHANNELS: &[&str] = &[
    "#general",
    "#sales",
    "#support",
    "#engineering",
    "#alerts",
    "#marketing",
    "#team-updates",
];
