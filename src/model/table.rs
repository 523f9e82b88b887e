use std::fmt;

/// Tables the dashboard watches for changes.
///
/// Realtime payloads name tables by their Postgres identifier; anything the
/// client does not know yet lands in [`TableId::Unknown`] so a newer backend
/// never breaks an older client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TableId {
    /// `thiet_bi`
    Equipment,
    /// `yeu_cau_luan_chuyen`
    TransferRequests,
    /// `lich_su_luan_chuyen`
    TransferHistory,
    /// `yeu_cau_sua_chua`
    RepairRequests,
    /// `ke_hoach_bao_tri`
    MaintenancePlans,
    /// `cong_viec_bao_tri`
    MaintenanceTasks,
    /// `nhan_vien`
    Staff,
    /// `nhat_ky_su_dung`
    UsageLogs,
    /// `lich_su_thiet_bi`
    EquipmentHistory,
    /// `khoa_phong`
    Departments,
    Unknown(String),
}

impl TableId {
    /// Every known table, in subscription order
    pub const WATCHED: [TableId; 10] = [
        TableId::Equipment,
        TableId::TransferRequests,
        TableId::TransferHistory,
        TableId::RepairRequests,
        TableId::MaintenancePlans,
        TableId::MaintenanceTasks,
        TableId::Staff,
        TableId::UsageLogs,
        TableId::EquipmentHistory,
        TableId::Departments,
    ];

    pub fn from_name(name: &str) -> Self {
        match name {
            "thiet_bi" => TableId::Equipment,
            "yeu_cau_luan_chuyen" => TableId::TransferRequests,
            "lich_su_luan_chuyen" => TableId::TransferHistory,
            "yeu_cau_sua_chua" => TableId::RepairRequests,
            "ke_hoach_bao_tri" => TableId::MaintenancePlans,
            "cong_viec_bao_tri" => TableId::MaintenanceTasks,
            "nhan_vien" => TableId::Staff,
            "nhat_ky_su_dung" => TableId::UsageLogs,
            "lich_su_thiet_bi" => TableId::EquipmentHistory,
            "khoa_phong" => TableId::Departments,
            other => TableId::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TableId::Equipment => "thiet_bi",
            TableId::TransferRequests => "yeu_cau_luan_chuyen",
            TableId::TransferHistory => "lich_su_luan_chuyen",
            TableId::RepairRequests => "yeu_cau_sua_chua",
            TableId::MaintenancePlans => "ke_hoach_bao_tri",
            TableId::MaintenanceTasks => "cong_viec_bao_tri",
            TableId::Staff => "nhan_vien",
            TableId::UsageLogs => "nhat_ky_su_dung",
            TableId::EquipmentHistory => "lich_su_thiet_bi",
            TableId::Departments => "khoa_phong",
            TableId::Unknown(name) => name,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TableId::Unknown(_))
    }
}

impl fmt::Display for TableId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
