use crate::model::{Frame, Sheet};
use crate::pipeline::PackResult;
use serde_json::{Value, json};
use std::collections::HashMap;

fn meta(result: &PackResult) -> Value {
    json!({
        "app": "sheet-packer",
        "version": env!("CARGO_PKG_VERSION"),
        "format": "RGBA8888",
        "packer": result.packer.name(),
        "method": result.method,
        "allowRotation": result.allow_rotation,
        "efficiency": result.efficiency,
    })
}

fn frame_fields(fr: &Frame) -> serde_json::Map<String, Value> {
    let mut source_size = json!({"w": fr.source_size.w, "h": fr.source_size.h});
    if let (Some(mw), Some(mh)) = (fr.source_size.mw, fr.source_size.mh) {
        source_size["mw"] = json!(mw);
        source_size["mh"] = json!(mh);
    }
    let ss = fr.sprite_source_size;
    let mut map = serde_json::Map::new();
    map.insert(
        "frame".into(),
        json!({"x": fr.frame.x, "y": fr.frame.y, "w": fr.frame.w, "h": fr.frame.h}),
    );
    map.insert("rotated".into(), json!(fr.rotated));
    map.insert("trimmed".into(), json!(fr.trimmed));
    map.insert(
        "spriteSourceSize".into(),
        json!({"x": ss.x, "y": ss.y, "w": ss.w, "h": ss.h}),
    );
    map.insert("sourceSize".into(), source_size);
    if fr.cloned {
        map.insert("cloned".into(), json!(true));
    }
    map
}

fn sheet_order<'a>(sheet: &'a Sheet, order: &[String]) -> Vec<&'a Frame> {
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let mut frames: Vec<&Frame> = sheet.frames.iter().collect();
    frames.sort_by_key(|f| rank.get(f.name.as_str()).copied().unwrap_or(usize::MAX));
    frames
}

/// Array-of-sheets JSON: `{ sheets: [{ id, width, height, frames: [..] }], meta }`.
/// Frames follow `result.export_order` within each sheet.
pub fn to_json_array(result: &PackResult) -> Value {
    let sheets: Vec<Value> = result
        .sheets
        .iter()
        .map(|sheet| {
            let frames: Vec<Value> = sheet_order(sheet, &result.export_order)
                .into_iter()
                .map(|fr| {
                    let mut fields = frame_fields(fr);
                    fields.insert("filename".into(), json!(fr.name));
                    Value::Object(fields)
                })
                .collect();
            json!({
                "id": sheet.id,
                "width": sheet.width,
                "height": sheet.height,
                "frames": frames,
            })
        })
        .collect();
    json!({ "sheets": sheets, "meta": meta(result) })
}

/// TexturePacker-like hash: `{ frames: { name: { frame, rotated, trimmed,
/// spriteSourceSize, sourceSize, sheet, sheetSize } }, meta }`.
pub fn to_json_hash(result: &PackResult) -> Value {
    let mut frames = serde_json::Map::new();
    for sheet in &result.sheets {
        for fr in sheet_order(sheet, &result.export_order) {
            let mut fields = frame_fields(fr);
            fields.insert("sheet".into(), json!(sheet.id));
            fields.insert(
                "sheetSize".into(),
                json!({"w": sheet.width, "h": sheet.height}),
            );
            frames.insert(fr.name.clone(), Value::Object(fields));
        }
    }
    json!({ "frames": frames, "meta": meta(result) })
}
