// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 文件上传字段以及对上传临时文件的处理。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::common::Attributes;
use crate::element::input::{input_html, label_list};
use crate::element::{Element, ElementArgs, ElementBase, FormContext};
use crate::exception::{Exception, Result};
use crate::value::{UploadError, UploadedFile, Value};

/// 上传是否成功且临时文件确实存在
pub fn is_uploaded_file(file: &UploadedFile) -> bool {
    file.error == UploadError::Ok
        && !file.tmp_name.as_os_str().is_empty()
        && file.tmp_name.is_file()
}

/// 把临时文件移动到 `dest_dir`，文件名缺省时使用客户端文件名的最后一段。
///
/// 跨文件系统无法重命名时退化为复制后删除。
pub fn move_uploaded_file(file: &UploadedFile, dest_dir: &Path, file_name: Option<&str>) -> Result<PathBuf> {
    if !is_uploaded_file(file) {
        return Err(Exception::ElementFailure(format!(
            "'{}' is not an uploaded file",
            file.tmp_name.display()
        )));
    }
    let base_name = match file_name {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => Path::new(&file.name.replace('\\', "/"))
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    if base_name.is_empty() {
        return Err(Exception::ElementFailure("uploaded file has no name".to_string()));
    }
    let dest = dest_dir.join(base_name);
    match fs::rename(&file.tmp_name, &dest) {
        Ok(()) => {}
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            warn!("重命名上传文件失败 ({}), 改为复制", e);
            fs::copy(&file.tmp_name, &dest)?;
            fs::remove_file(&file.tmp_name)?;
        }
        Err(e) => return Err(e.into()),
    }
    info!("上传文件已保存到 {}", dest.display());
    Ok(dest)
}

/// 文件上传字段，值只来自提交的文件，不可冻结。
#[derive(Debug, Clone, Default)]
pub struct File {
    base: ElementBase,
    upload: Option<UploadedFile>,
}

impl File {
    pub fn new(name: &str, label: &str, attributes: impl Into<Attributes>) -> Self {
        let mut base = ElementBase::new(name, label_list(label), attributes.into());
        base.attributes.set("type", "file");
        Self { base, upload: None }
    }

    pub fn upload(&self) -> Option<&UploadedFile> {
        self.upload.as_ref()
    }

    pub fn is_uploaded_file(&self) -> bool {
        self.upload.as_ref().is_some_and(is_uploaded_file)
    }

    pub fn move_uploaded_file(&self, dest_dir: &Path, file_name: Option<&str>) -> Result<PathBuf> {
        let upload = self
            .upload
            .as_ref()
            .ok_or_else(|| Exception::ElementFailure(format!("no file uploaded for '{}'", self.name())))?;
        move_uploaded_file(upload, dest_dir, file_name)
    }
}

impl Element for File {
    fn base(&self) -> &ElementBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    fn element_type(&self) -> &'static str {
        "file"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = File::new(&args.text_or(0, ""), "", args.attrs(2));
        self.base.labels = args.labels(1);
        Ok(())
    }

    fn value(&self) -> Option<Value> {
        self.upload.clone().map(Value::File)
    }

    /// 只接受上传记录，其他值被忽略
    fn set_value(&mut self, value: &Value) {
        if let Value::File(f) = value {
            self.upload = Some(f.clone());
        }
    }

    fn editable_html(&self) -> String {
        input_html(&self.base)
    }

    fn freeze(&mut self) -> bool {
        false
    }

    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        self.upload = match ctx.file_value(self.name()) {
            Some(Value::File(f)) => Some(f),
            _ => None,
        };
        Ok(())
    }

    fn export_value(&mut self, _submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        Ok(self.prepare_value(self.value(), assoc))
    }
}
