// ==========================================
// 学期选课注册系统 - 引擎层事件发布
// ==========================================
// 职责: 定义学分事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，外部缴费通知方实现适配器
// 约定: 事务提交后发布；发布失败只记日志，不影响业务结果
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 学分事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditEventKind {
    /// 选课/退课导致已选学分变化
    CreditsChanged,
    /// 学生确认注册
    RegistrationConfirmed,
    /// 新学期开启，按已确认学分计费
    TermBilled,
}

impl CreditEventKind {
    pub fn as_str(&self) -> &str {
        match self {
            CreditEventKind::CreditsChanged => "CreditsChanged",
            CreditEventKind::RegistrationConfirmed => "RegistrationConfirmed",
            CreditEventKind::TermBilled => "TermBilled",
        }
    }
}

/// 学分事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditEvent {
    pub kind: CreditEventKind,
    pub student_id: String,
    pub registration_id: String,
    /// 事件发生后的总学分
    pub total_credits: i64,
    /// 本次变化量（确认/计费事件为 0）
    pub delta: i64,
}

impl CreditEvent {
    pub fn new(
        kind: CreditEventKind,
        student_id: &str,
        registration_id: &str,
        total_credits: i64,
        delta: i64,
    ) -> Self {
        Self {
            kind,
            student_id: student_id.to_string(),
            registration_id: registration_id.to_string(),
            total_credits,
            delta,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 学分事件发布者 Trait
///
/// Engine 层定义，外部通知方实现
pub trait CreditEventPublisher: Send + Sync {
    /// 发布学分事件（fire-and-forget）
    fn publish(&self, event: CreditEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpCreditEventPublisher;

impl CreditEventPublisher for NoOpCreditEventPublisher {
    fn publish(&self, event: CreditEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpCreditEventPublisher: 跳过事件发布 - student_id={}, kind={}",
            event.student_id,
            event.kind.as_str()
        );
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn CreditEventPublisher>> 的使用；发布失败只记 warn
#[derive(Clone, Default)]
pub struct OptionalCreditEventPublisher {
    inner: Option<Arc<dyn CreditEventPublisher>>,
}

impl OptionalCreditEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn CreditEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: CreditEvent) {
        let Some(publisher) = &self.inner else {
            tracing::debug!(
                "OptionalCreditEventPublisher: 未配置发布者，跳过事件 - student_id={}, kind={}",
                event.student_id,
                event.kind.as_str()
            );
            return;
        };

        let student_id = event.student_id.clone();
        let kind = event.kind;
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(
                student_id = %student_id,
                kind = kind.as_str(),
                error = %e,
                "学分事件发布失败（已忽略）"
            );
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        events: Mutex<Vec<CreditEvent>>,
    }

    impl CreditEventPublisher for RecordingPublisher {
        fn publish(&self, event: CreditEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct FailingPublisher;

    impl CreditEventPublisher for FailingPublisher {
        fn publish(&self, _event: CreditEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            Err("notifier offline".into())
        }
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpCreditEventPublisher;
        let event = CreditEvent::new(CreditEventKind::CreditsChanged, "ST1", "R1", 3, 3);
        assert!(publisher.publish(event).is_ok());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalCreditEventPublisher::none();
        assert!(!publisher.is_configured());
        publisher.publish(CreditEvent::new(CreditEventKind::TermBilled, "ST1", "R1", 12, 0));
    }

    #[test]
    fn test_optional_publisher_forwards_events() {
        let inner = Arc::new(RecordingPublisher::default());
        let publisher = OptionalCreditEventPublisher::with_publisher(inner.clone());
        assert!(publisher.is_configured());

        publisher.publish(CreditEvent::new(CreditEventKind::CreditsChanged, "ST1", "R1", 3, 3));
        publisher.publish(CreditEvent::new(CreditEventKind::CreditsChanged, "ST1", "R1", 0, -3));

        let events = inner.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].delta, -3);
    }

    #[test]
    fn test_optional_publisher_swallows_errors() {
        let publisher = OptionalCreditEventPublisher::with_publisher(Arc::new(FailingPublisher));
        publisher.publish(CreditEvent::new(CreditEventKind::RegistrationConfirmed, "ST1", "R1", 12, 0));
    }
}
