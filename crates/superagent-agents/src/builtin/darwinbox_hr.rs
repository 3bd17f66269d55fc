use chrono::{Datelike, NaiveDate, Weekday};
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use superagent_core::error::Result;
use superagent_core::traits::Agent;
use superagent_core::types::{
    AgentCategory, AgentDefinition, AgentExecutionResult, ExecutionContext,
};

use super::{parse_config, BuiltinAgent};
use crate::connectors::{self, EmployeeFilter};
use crate::schema::schema_for;

const AGENT_TYPE: &str = "darwinbox_hr";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HrAction {
    EmployeeGet,
    #[default]
    EmployeeSearch,
    LeaveGetBalance,
    LeaveRequest,
    AttendanceSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DarwinboxHrConfig {
    #[serde(default)]
    pub action: HrAction,
    /// Action-specific parameters, e.g. employee_id, filters, start_date
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Core HR operations: employee lookup, leave, attendance.
pub struct DarwinboxHrAgent {
    config: DarwinboxHrConfig,
}

type ActionResult = std::result::Result<Value, String>;

impl DarwinboxHrAgent {
    fn param_str(&self, key: &str) -> std::result::Result<&str, String> {
        self.config
            .params
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("{key} is required"))
    }

    fn param_u32(&self, key: &str) -> std::result::Result<u32, String> {
        self.config
            .params
            .get(key)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| format!("{key} is required"))
    }

    fn param_date(&self, key: &str) -> std::result::Result<NaiveDate, String> {
        let raw = self.param_str(key)?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("{key} must be YYYY-MM-DD"))
    }

    fn employee_id(&self) -> std::result::Result<&str, String> {
        let id = self.param_str("employee_id")?;
        match connectors::hr_employee(id) {
            Some(_) => Ok(id),
            None => Err(format!("Employee {id} not found")),
        }
    }

    fn employee_get(&self) -> ActionResult {
        let id = self.param_str("employee_id")?;
        let employee =
            connectors::hr_employee(id).ok_or_else(|| format!("Employee {id} not found"))?;
        Ok(json!({ "action": "employee_get", "employee": employee }))
    }

    fn employee_search(&self) -> ActionResult {
        let filters = self.config.params.get("filters");
        let field = |k: &str| {
            filters
                .and_then(|f| f.get(k))
                .and_then(Value::as_str)
                .map(String::from)
        };
        let employees = connectors::hr_employees(&EmployeeFilter {
            department: field("department"),
            performance_rating: field("performance_rating"),
            manager_id: field("manager_id"),
        });
        Ok(json!({
            "action": "employee_search",
            "count": employees.len(),
            "employees": employees,
        }))
    }

    fn leave_get_balance(&self) -> ActionResult {
        let id = self.employee_id()?;
        let balances = connectors::hr_leave_balances(id).unwrap_or_default();
        Ok(json!({ "action": "leave_get_balance", "employee_id": id, "balances": balances }))
    }

    fn leave_request(&self, ctx: &ExecutionContext) -> ActionResult {
        let id = self.employee_id()?;
        let leave_type = self.param_str("leave_type")?;
        let start = self.param_date("start_date")?;
        let end = self.param_date("end_date")?;
        if end < start {
            return Err("end_date is before start_date".into());
        }
        let days = (end - start).num_days() + 1;

        let balances = connectors::hr_leave_balances(id).unwrap_or_default();
        let available = balances
            .iter()
            .find(|b| b["leave_type"] == leave_type)
            .and_then(|b| b["available_days"].as_i64())
            .ok_or_else(|| format!("Unknown leave type: {leave_type}"))?;
        if days > available {
            return Err(format!(
                "Insufficient {leave_type} balance: requested {days}, available {available}"
            ));
        }

        let leave_id = format!("LV_{}", ctx.execution_id);
        Ok(json!({
            "action": "leave_request",
            "leave_id": leave_id,
            "leave_request": {
                "leave_id": leave_id,
                "employee_id": id,
                "leave_type": leave_type,
                "start_date": start,
                "end_date": end,
                "days": days,
                "reason": self.config.params.get("reason"),
                "status": "pending",
            },
        }))
    }

    fn attendance_summary(&self) -> ActionResult {
        let id = self.employee_id()?;
        let month = self.param_u32("month")?;
        let year = self.param_u32("year")?;
        let year = i32::try_from(year).map_err(|_| "year is out of range".to_string())?;
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| format!("invalid month: {year}-{month}"))?;

        let working_days = first
            .iter_days()
            .take_while(|d| d.month() == month)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as u32;
        let seed: u32 = id.trim_start_matches("emp_").parse().unwrap_or(0);
        let absent = seed % 3;
        let late = seed % 4;

        Ok(json!({
            "action": "attendance_summary",
            "summary": {
                "employee_id": id,
                "month": month,
                "year": year,
                "working_days": working_days,
                "present_days": working_days - absent,
                "absent_days": absent,
                "late_days": late,
            },
        }))
    }
}

impl BuiltinAgent for DarwinboxHrAgent {
    fn definition() -> AgentDefinition {
        AgentDefinition {
            agent_type: AGENT_TYPE.into(),
            name: "Darwinbox HR Agent".into(),
            description: "Core HR operations: employees, leave, attendance management".into(),
            category: AgentCategory::DataRetrieval,
            icon: "users".into(),
            supported_connectors: vec!["darwinbox".into()],
            config_schema: schema_for::<DarwinboxHrConfig>(),
        }
    }

    fn from_config(config: &Value) -> Result<Self> {
        Ok(Self {
            config: parse_config(AGENT_TYPE, config)?,
        })
    }
}

impl Agent for DarwinboxHrAgent {
    fn agent_type(&self) -> &str {
        AGENT_TYPE
    }

    fn execute(
        &self,
        _input: Value,
        ctx: ExecutionContext,
    ) -> BoxFuture<'_, Result<AgentExecutionResult>> {
        Box::pin(async move {
            let action = self.config.action;
            let outcome = match action {
                HrAction::EmployeeGet => self.employee_get(),
                HrAction::EmployeeSearch => self.employee_search(),
                HrAction::LeaveGetBalance => self.leave_get_balance(),
                HrAction::LeaveRequest => self.leave_request(&ctx),
                HrAction::AttendanceSummary => self.attendance_summary(),
            };

            Ok(match outcome {
                Ok(output) => AgentExecutionResult::success(output, 0, 0.0),
                Err(e) => {
                    tracing::warn!(execution_id = %ctx.execution_id, ?action, error = %e, "HR action failed");
                    AgentExecutionResult::failure(e)
                }
            })
        })
    }
}
