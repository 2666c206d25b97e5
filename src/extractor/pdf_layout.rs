use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;

/// Average glyph width as a share of the font size; no font metrics are read
const CHAR_WIDTH_RATIO: f32 = 0.5;
/// Horizontal gap, in font sizes, that separates two table cells
const COLUMN_GAP_RATIO: f32 = 1.0;
/// Horizontal gap, in font sizes, rendered as a space inside one cell
const WORD_GAP_RATIO: f32 = 0.2;
/// TJ adjustment (thousandths of an em) wide enough to count as a space
const TJ_SPACE_THRESHOLD: f32 = 250.0;

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// A string shown on the page, positioned in user space
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub font_size: f32,
    pub text: String,
}

impl TextRun {
    fn right(&self) -> f32 {
        self.x + self.width
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font_key: Vec<u8>,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    ctm: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            ctm: IDENTITY,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }

    /// Text-space width of `text` under the current spacing
    fn advance_for(&self, text: &str) -> f32 {
        text.chars()
            .map(|c| {
                let word = if c == ' ' { self.word_spacing } else { 0.0 };
                (self.font_size * CHAR_WIDTH_RATIO + self.char_spacing + word) * self.horiz_scale
            })
            .sum()
    }

    fn advance(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    /// Text matrix composed with the CTM
    fn rendering_matrix(&self) -> [f32; 6] {
        multiply(&self.text_matrix, &self.ctm)
    }

    fn run(&self, text: String, advance: f32) -> TextRun {
        let m = self.rendering_matrix();
        let x_scale = (m[0] * m[0] + m[1] * m[1]).sqrt();
        let y_scale = (m[2] * m[2] + m[3] * m[3]).sqrt();
        TextRun {
            x: m[4],
            y: m[5],
            width: advance * x_scale,
            font_size: (self.font_size * y_scale).abs(),
            text,
        }
    }
}

/// `a` applied first, then `b`
fn multiply(a: &[f32; 6], b: &[f32; 6]) -> [f32; 6] {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn number(object: &Object) -> Option<f32> {
    object.as_float().ok()
}

fn matrix(operands: &[Object]) -> Option<[f32; 6]> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(m)
}

/// Walk content-stream operations and collect positioned strings.
///
/// `encodings` maps font resource keys (`F1`) to their encoding names.
pub fn text_runs(operations: &[Operation], encodings: &BTreeMap<Vec<u8>, String>) -> Vec<TextRun> {
    let mut state = TextState::default();
    let mut saved: Vec<[f32; 6]> = Vec::new();
    let mut runs = Vec::new();

    let decode = |state: &TextState, bytes: &[u8]| {
        let encoding = encodings.get(&state.font_key).map(String::as_str);
        Document::decode_text(encoding, bytes)
    };

    for op in operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => saved.push(state.ctm),
            "Q" => {
                if let Some(ctm) = saved.pop() {
                    state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = matrix(operands) {
                    state.ctm = multiply(&m, &state.ctm);
                }
            }
            "BT" => {
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "Tf" => {
                if let (Some(key), Some(size)) = (
                    operands.first().and_then(|o| o.as_name().ok()),
                    operands.get(1).and_then(number),
                ) {
                    state.font_key = key.to_vec();
                    state.font_size = size;
                }
            }
            "Tm" => {
                if let Some(m) = matrix(operands) {
                    state.text_matrix = m;
                    state.line_matrix = m;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (operands.first().and_then(number), operands.get(1).and_then(number)) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.translate_line(tx, ty);
                }
            }
            "TL" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = operands.first().and_then(number) {
                    state.horiz_scale = v / 100.0;
                }
            }
            "T*" => state.next_line(),
            "Tj" | "'" | "\"" => {
                let string = match op.operator.as_str() {
                    "Tj" => operands.first(),
                    "'" => {
                        state.next_line();
                        operands.first()
                    }
                    _ => {
                        if let Some(v) = operands.first().and_then(number) {
                            state.word_spacing = v;
                        }
                        if let Some(v) = operands.get(1).and_then(number) {
                            state.char_spacing = v;
                        }
                        state.next_line();
                        operands.get(2)
                    }
                };
                if let Some(bytes) = string.and_then(|o| o.as_str().ok()) {
                    let text = decode(&state, bytes);
                    let advance = state.advance_for(&text);
                    runs.push(state.run(text, advance));
                    state.advance(advance);
                }
            }
            "TJ" => {
                let Some(items) = operands.first().and_then(|o| o.as_array().ok()) else {
                    continue;
                };
                let start = state.clone();
                let mut text = String::new();
                let mut advance = 0.0;
                for item in items {
                    if let Ok(bytes) = item.as_str() {
                        let piece = decode(&state, bytes);
                        advance += state.advance_for(&piece);
                        text.push_str(&piece);
                    } else if let Some(adjust) = number(item) {
                        if adjust < -TJ_SPACE_THRESHOLD && !text.ends_with(' ') {
                            text.push(' ');
                        }
                        advance -= adjust / 1000.0 * state.font_size * state.horiz_scale;
                    }
                }
                runs.push(start.run(text, advance));
                state.advance(advance);
            }
            _ => {}
        }
    }

    runs.retain(|run| !run.text.trim().is_empty());
    runs
}

/// Rebuild page lines from positioned runs.
///
/// Runs sharing a baseline form one line, top to bottom. Within a line,
/// runs separated by a column-sized gap are joined with a tab so the
/// table detector sees them as separate cells.
pub fn layout_text(runs: &[TextRun]) -> String {
    let mut sorted: Vec<&TextRun> = runs.iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<&TextRun>> = Vec::new();
    for run in sorted {
        let tolerance = (run.font_size * 0.5).max(1.0);
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= tolerance => line.push(run),
            _ => lines.push(vec![run]),
        }
    }

    let mut out = String::new();
    for mut line in lines {
        line.sort_by(|a, b| a.x.total_cmp(&b.x));
        let mut previous: Option<&TextRun> = None;
        for run in line {
            if let Some(prev) = previous {
                let gap = run.x - prev.right();
                let size = prev.font_size.max(run.font_size).max(1.0);
                if gap > size * COLUMN_GAP_RATIO {
                    out.push('\t');
                } else if gap > size * WORD_GAP_RATIO {
                    out.push(' ');
                }
            }
            out.push_str(&run.text);
            previous = Some(run);
        }
        out.push('\n');
    }
    out
}

/// Page text with column gaps made explicit
pub fn page_layout_text(document: &Document, page_id: ObjectId) -> lopdf::Result<String> {
    let content = Content::decode(&document.get_page_content(page_id)?)?;
    let encodings: BTreeMap<Vec<u8>, String> = document
        .get_page_fonts(page_id)
        .into_iter()
        .map(|(key, font)| (key, font.get_font_encoding().to_string()))
        .collect();
    Ok(layout_text(&text_runs(&content.operations, &encodings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    fn show(text: &str) -> Operation {
        op("Tj", vec![Object::string_literal(text)])
    }

    fn encodings() -> BTreeMap<Vec<u8>, String> {
        BTreeMap::from([(b"F1".to_vec(), "WinAnsiEncoding".to_string())])
    }

    #[test]
    fn test_td_moves_become_column_breaks() {
        let mut ops = vec![op("BT", vec![]), op("Tf", vec!["F1".into(), 10.into()]), op("Td", vec![50.into(), 700.into()])];
        for (i, cell) in ["Revenue", "10", "12"].iter().enumerate() {
            if i > 0 {
                ops.push(op("Td", vec![120.into(), 0.into()]));
            }
            ops.push(show(cell));
        }
        ops.push(op("ET", vec![]));

        let runs = text_runs(&ops, &encodings());
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].x, 170.0);
        assert_eq!(runs[2].y, 700.0);
        assert_eq!(layout_text(&runs), "Revenue\t10\t12\n");
    }

    #[test]
    fn test_consecutive_shows_stay_in_one_cell() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("Td", vec![50.into(), 700.into()]),
            show("Net "),
            show("income"),
            op("ET", vec![]),
        ];
        assert_eq!(layout_text(&text_runs(&ops, &encodings())), "Net income\n");
    }

    #[test]
    fn test_tm_and_t_star_position_lines() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("TL", vec![14.into()]),
            op("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 300.into(), 500.into()]),
            show("2024"),
            op("T*", vec![]),
            show("12"),
            op("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 500.into()]),
            show("Item"),
            op("Td", vec![0.into(), (-14).into()]),
            show("Revenue"),
            op("ET", vec![]),
        ];
        assert_eq!(layout_text(&text_runs(&ops, &encodings())), "Item\t2024\nRevenue\t12\n");
    }

    #[test]
    fn test_ctm_translation_applies_to_runs() {
        let ops = vec![
            op("q", vec![]),
            op("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 100.into(), 20.into()]),
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op("Td", vec![5.into(), 5.into()]),
            show("Cash"),
            op("ET", vec![]),
            op("Q", vec![]),
            op("BT", vec![]),
            op("Td", vec![5.into(), 5.into()]),
            show("Debt"),
            op("ET", vec![]),
        ];
        let runs = text_runs(&ops, &encodings());
        assert_eq!((runs[0].x, runs[0].y), (105.0, 25.0));
        assert_eq!((runs[1].x, runs[1].y), (5.0, 5.0));
    }

    #[test]
    fn test_tj_array_kerning_and_spaces() {
        let ops = vec![
            op("BT", vec![]),
            op("Tf", vec!["F1".into(), 10.into()]),
            op(
                "TJ",
                vec![Object::Array(vec![
                    Object::string_literal("Tot"),
                    (-20).into(),
                    Object::string_literal("al"),
                    (-400).into(),
                    Object::string_literal("assets"),
                ])],
            ),
            op("ET", vec![]),
        ];
        let runs = text_runs(&ops, &encodings());
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Total assets");
    }

    #[test]
    fn test_blank_runs_are_dropped() {
        let ops = vec![op("BT", vec![]), op("Tf", vec!["F1".into(), 10.into()]), show("   "), op("ET", vec![])];
        assert!(text_runs(&ops, &encodings()).is_empty());
        assert_eq!(layout_text(&[]), "");
    }
}
