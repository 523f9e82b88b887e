#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use tracing::info;

use crate::ChangeEvent;
use crate::ChangeKind;
use crate::TableId;

/// User-facing notification shown for new rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
}

#[cfg_attr(test, automock)]
pub trait Notifier: Send + Sync + 'static {
    fn notify(
        &self,
        toast: Toast,
    );
}

/// Default notifier: writes toasts to the log.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(
        &self,
        toast: Toast,
    ) {
        info!(title = %toast.title, description = %toast.description, "realtime toast");
    }
}

/// Toast for an INSERT on one of the tables users care to hear about.
///
/// Returns `None` for every other event.
pub fn insert_toast(event: &ChangeEvent) -> Option<Toast> {
    if event.kind != ChangeKind::Insert {
        return None;
    }

    let (title, fallback, name_field) = match event.table {
        TableId::Equipment => (
            "Thiết bị mới",
            "Một thiết bị mới vừa được thêm vào hệ thống",
            Some("ten_thiet_bi"),
        ),
        TableId::RepairRequests => ("Yêu cầu sửa chữa mới", "Có yêu cầu sửa chữa thiết bị mới", None),
        TableId::TransferRequests => (
            "Yêu cầu luân chuyển mới",
            "Có yêu cầu luân chuyển thiết bị mới",
            None,
        ),
        TableId::MaintenancePlans => (
            "Kế hoạch bảo trì mới",
            "Một kế hoạch bảo trì mới vừa được tạo",
            Some("ten_ke_hoach"),
        ),
        TableId::TransferHistory
        | TableId::MaintenanceTasks
        | TableId::Staff
        | TableId::UsageLogs
        | TableId::EquipmentHistory
        | TableId::Departments
        | TableId::Unknown(_) => return None,
    };

    let description = name_field
        .and_then(|field| record_text(event.new_record.as_ref(), field))
        .map(|name| format!("{fallback}: {name}"))
        .unwrap_or_else(|| fallback.to_string());

    Some(Toast {
        title: title.to_string(),
        description,
    })
}

fn record_text<'a>(
    record: Option<&'a Value>,
    field: &str,
) -> Option<&'a str> {
    record?.get(field)?.as_str().filter(|s| !s.trim().is_empty())
}
