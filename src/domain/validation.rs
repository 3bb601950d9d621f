//! 校验结果领域模型
//!
//! `valid` 永远等于 `errors.is_empty()`，只能通过构造方法维护

use serde::{Deserialize, Deserializer, Serialize};

/// 问题级别
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// 单条校验问题
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    /// 字段名（与写入 .env 的 key 一致）
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

/// 校验结果
///
/// 多个校验器的结果按调用顺序拼接
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl ValidationResult {
    /// 空结果（通过）
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// 追加一条问题
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => {
                self.errors.push(issue);
                self.valid = false;
            }
            Severity::Warning => self.warnings.push(issue),
        }
    }

    pub fn push_error(&mut self, field: &str, message: impl Into<String>) {
        self.push(ValidationIssue::error(field, message));
    }

    pub fn push_warning(&mut self, field: &str, message: impl Into<String>) {
        self.push(ValidationIssue::warning(field, message));
    }

    /// 合并另一个结果，保持各自的顺序
    pub fn merge(&mut self, other: ValidationResult) {
        for issue in other.errors.into_iter().chain(other.warnings) {
            self.push(issue);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ValidationIssue] {
        &self.warnings
    }
}

/// 表单原始值
///
/// 前端可能提交字符串、数字或布尔值；统一转成原始文本，不做类型转换。
/// null 或缺失视为空串。
pub fn deserialize_raw<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    })
}
