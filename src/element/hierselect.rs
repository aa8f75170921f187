// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 级联下拉列表：第 i 级的选项由前 i 级已选的值决定。
//!
//! 选项按级别存放：第 0 级是 `值 → 文字` 映射，第 i 级是以前 i 级的值为路径
//! 逐层嵌套的映射。每次设置值后，从第 0 级开始沿已选值（锚点）向下装载选项；
//! 某级的已选值不在当前选项中时，该级第一个选项成为新的锚点与已选值。

use crate::common::Attributes;
use crate::element::input::label_list;
use crate::element::{Element, ElementArgs, ElementBase, FormContext, Group, Select};
use crate::exception::Result;
use crate::renderer::Renderer;
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct HierSelect {
    group: Group,
    options: Vec<Value>,
}

impl HierSelect {
    pub fn new(name: &str, label: &str, attributes: impl Into<Attributes>, separator: Option<&str>) -> Self {
        let mut group = Group::new(name, label, Vec::new(), separator, true);
        group.base = ElementBase::new(name, label_list(label), attributes.into());
        Self {
            group,
            options: Vec::new(),
        }
    }

    /// 设置各级选项，按需追加下拉列表
    pub fn set_options(&mut self, options: Vec<Value>) {
        let attributes = self.group.base.attributes.clone();
        let children = self.group.children_mut();
        for level in children.len()..options.len() {
            let empty: &[(&str, &str)] = &[];
            let select = Select::new(&level.to_string(), "", empty, attributes.clone());
            children.push(Box::new(select));
        }
        self.options = options;
        self.load_options();
    }

    pub fn options(&self) -> &[Value] {
        &self.options
    }

    /// 沿锚点路径为每一级装载选项
    fn load_options(&mut self) {
        let mut anchor: Vec<String> = Vec::new();
        let options = &self.options;
        for (level, child) in self.group.children_mut().iter_mut().enumerate() {
            let Some(table) = options.get(level).and_then(|o| o.get_path(&anchor)).and_then(Value::as_map) else {
                continue;
            };
            let Some(select) = child.downcast_mut::<Select>() else {
                continue;
            };
            let selected = select.selected().first().cloned();
            select.clear_options();
            for (value, text) in table {
                select.add_option(text.text(), value, None);
            }
            let current = match selected {
                Some(v) if table.contains_key(&v) => v,
                _ => match table.keys().next() {
                    Some(first) => first.clone(),
                    None => continue,
                },
            };
            select.set_value(&Value::from(current.as_str()));
            anchor.push(current);
        }
    }
}

impl Element for HierSelect {
    fn base(&self) -> &ElementBase {
        &self.group.base
    }

    fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.group.base
    }

    fn element_type(&self) -> &'static str {
        "hierselect"
    }

    fn create(&mut self, args: &ElementArgs) -> Result<()> {
        *self = HierSelect::new(&args.text_or(0, ""), "", args.attrs(2), args.text(3));
        self.group.base.labels = args.labels(1);
        Ok(())
    }

    fn value(&self) -> Option<Value> {
        self.group.value()
    }

    fn set_value(&mut self, value: &Value) {
        self.group.set_value(value);
        self.load_options();
    }

    fn editable_html(&self) -> String {
        self.group.editable_html()
    }

    fn frozen_html(&self) -> String {
        self.group.frozen_html()
    }

    fn freeze(&mut self) -> bool {
        self.group.freeze()
    }

    fn unfreeze(&mut self) {
        self.group.unfreeze();
    }

    fn set_persistent_freeze(&mut self, persist: bool) {
        self.group.set_persistent_freeze(persist);
    }

    /// 整体解析值，再据此装载各级选项
    fn update_value(&mut self, ctx: &FormContext) -> Result<()> {
        if let Some(value) = ctx.standard_value(self.name()) {
            self.set_value(&value);
        }
        Ok(())
    }

    fn export_value(&mut self, submitted: &Value, assoc: bool) -> Result<Option<Value>> {
        self.group.export_value(submitted, assoc)
    }

    fn accept(&mut self, renderer: &mut dyn Renderer, required: bool, error: Option<&str>) -> Result<()> {
        renderer.render_element(&*self, required, error);
        Ok(())
    }

    fn as_group(&self) -> Option<&Group> {
        Some(&self.group)
    }

    fn as_group_mut(&mut self) -> Option<&mut Group> {
        Some(&mut self.group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car_select() -> HierSelect {
        let mut hs = HierSelect::new("car", "Car", "", Some("<br />"));
        hs.set_options(vec![
            Value::map([("vw", "Volkswagen"), ("bmw", "BMW")]),
            Value::map([
                ("vw", Value::map([("golf", "Golf"), ("polo", "Polo")])),
                ("bmw", Value::map([("x5", "X5"), ("m3", "M3")])),
            ]),
        ]);
        hs
    }

    fn level_options(hs: &HierSelect, level: usize) -> Vec<String> {
        hs.as_group().unwrap().children()[level]
            .downcast_ref::<Select>()
            .unwrap()
            .options()
            .iter()
            .map(|o| o.value().to_string())
            .collect()
    }

    #[test]
    fn test_first_option_becomes_anchor() {
        let hs = car_select();
        assert_eq!(level_options(&hs, 0), vec!["vw", "bmw"]);
        assert_eq!(level_options(&hs, 1), vec!["golf", "polo"]);
        assert_eq!(hs.value(), Some(Value::map([("0", "vw"), ("1", "golf")])));
    }

    #[test]
    fn test_set_value_reloads_dependent_level() {
        let mut hs = car_select();
        hs.set_value(&Value::list(["bmw", "m3"]));
        assert_eq!(level_options(&hs, 1), vec!["x5", "m3"]);
        assert_eq!(hs.value(), Some(Value::map([("0", "bmw"), ("1", "m3")])));

        hs.set_value(&Value::list(["bmw", "golf"]));
        assert_eq!(hs.value(), Some(Value::map([("0", "bmw"), ("1", "x5")])));
    }

    #[test]
    fn test_render_uses_bracketed_names() {
        let hs = car_select();
        let html = hs.to_html();
        assert!(html.contains(r#"name="car[0]""#));
        assert!(html.contains(r#"name="car[1]""#));
        assert!(html.contains("</select><br /><select"));
        assert_eq!(hs.name(), "car");
    }

    #[test]
    fn test_update_from_submitted() {
        let mut hs = car_select();
        let ctx = FormContext {
            submitted: Value::map([("car", Value::list(["bmw", "x5"]))]),
            is_submitted: true,
            ..FormContext::default()
        };
        hs.update_value(&ctx).unwrap();
        assert_eq!(hs.value(), Some(Value::map([("0", "bmw"), ("1", "x5")])));
        let exported = hs.export_value(&ctx.submitted, true).unwrap().unwrap();
        assert_eq!(exported.lookup("car[1]"), Some(&Value::from("x5")));
    }
}
