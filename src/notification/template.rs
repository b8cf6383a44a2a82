//! 消息模板模块
//!
//! 使用Handlebars渲染状态变化汇总

use crate::error::NotificationError;
use crate::health::Transition;
use chrono::Utc;
use handlebars::Handlebars;
use serde_json::{json, Value};

/// 模板注册名称
const CHANGES_TEMPLATE: &str = "changes";

/// 默认的状态变化模板，每个变化一行
pub fn default_changes_template() -> &'static str {
    "{{#each changes}}{{this.endpoint}} = {{this.current}}.\n{{/each}}"
}

/// 状态变化消息模板
pub struct ChangeTemplate {
    registry: Handlebars<'static>,
}

impl ChangeTemplate {
    /// 创建模板
    ///
    /// # 参数
    /// * `template` - 自定义模板，`None` 时使用默认模板
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 模板语法错误时返回错误
    pub fn new(template: Option<&str>) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(
                CHANGES_TEMPLATE,
                template.unwrap_or(default_changes_template()),
            )
            .map_err(|e| NotificationError::TemplateError(e.to_string()))?;

        Ok(Self { registry })
    }

    /// 渲染状态变化
    pub fn render(&self, changes: &[Transition]) -> Result<String, NotificationError> {
        self.registry
            .render(CHANGES_TEMPLATE, &Self::context(changes))
            .map_err(|e| NotificationError::TemplateError(e.to_string()))
    }

    /// 构建模板上下文
    fn context(changes: &[Transition]) -> Value {
        let items: Vec<Value> = changes
            .iter()
            .map(|t| {
                json!({
                    "endpoint": t.endpoint.to_string(),
                    "address": t.endpoint.address,
                    "port": t.endpoint.port,
                    "protocol": t.endpoint.protocol.as_str(),
                    "previous": t.previous.as_str(),
                    "current": t.current.as_str(),
                    "recovered": t.is_recovery(),
                    "observed_at": t.observed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                })
            })
            .collect();

        let down_count = changes.iter().filter(|t| !t.is_recovery()).count();

        json!({
            "changes": items,
            "down_count": down_count,
            "up_count": changes.len() - down_count,
            "timestamp": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{EndpointId, HostStatus, Protocol};

    fn changes() -> Vec<Transition> {
        let a = EndpointId::new("10.0.0.1", 80, Protocol::Tcp);
        let b = EndpointId::new("10.0.0.2", 53, Protocol::Udp);
        vec![
            Transition::between(&b, HostStatus::Down, HostStatus::Up).unwrap(),
            Transition::between(&a, HostStatus::Up, HostStatus::Down).unwrap(),
        ]
    }

    #[test]
    fn test_default_template_one_line_per_change() {
        let template = ChangeTemplate::new(None).unwrap();
        let rendered = template.render(&changes()).unwrap();
        assert_eq!(rendered, "10.0.0.2:53:udp = up.\n10.0.0.1:80:tcp = down.\n");
    }

    #[test]
    fn test_custom_template_counts() {
        let template =
            ChangeTemplate::new(Some("{{down_count}} down / {{up_count}} up")).unwrap();
        assert_eq!(template.render(&changes()).unwrap(), "1 down / 1 up");
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let result = ChangeTemplate::new(Some("{{#each changes}}"));
        assert!(matches!(result, Err(NotificationError::TemplateError(_))));
    }
}
