use crate::core::Storage;
use crate::domain::ports::HandoffSlot;
use crate::utils::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// 以檔案保存交接資料，每個欄位一個 JSON 檔
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn slot_path(&self, slot: HandoffSlot) -> PathBuf {
        Path::new(&self.base_path).join(format!("{}.json", slot.key()))
    }
}

impl Storage for LocalStorage {
    async fn read_slot(&self, slot: HandoffSlot) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.slot_path(slot)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_slot(&self, slot: HandoffSlot, data: &[u8]) -> Result<()> {
        let full_path = self.slot_path(slot);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // 先寫暫存檔再改名，避免結果頁讀到寫一半的檔案
        let tmp_path = full_path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, &full_path).await?;
        Ok(())
    }

    async fn clear_slot(&self, slot: HandoffSlot) -> Result<()> {
        match tokio::fs::remove_file(self.slot_path(slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
