use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use std::io::Cursor;
use umya_spreadsheet::{Border, HorizontalAlignmentValues, Spreadsheet};

use statement_consolidator::export::RenderMode;
use statement_consolidator::extractor::{SpreadsheetExtractor, TableExtractor};
use statement_consolidator::processing::FailureStage;
use statement_consolidator::table_cleaner::TableCleaner;
use statement_consolidator::table_model::CellValue;
use statement_consolidator::{
    process_batch, BatchProcessor, Category, ConsolidateError, ConsolidatorConfig, Document,
};

fn xlsx_bytes(book: &Spreadsheet) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor).unwrap();
    cursor.into_inner()
}

fn reopen(bytes: &[u8]) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true).unwrap()
}

fn sheet_names(book: &Spreadsheet) -> Vec<String> {
    book.get_sheet_collection()
        .iter()
        .map(|s| s.get_name().to_string())
        .collect()
}

/// Statement with title rows above the real header, plus a second sheet
fn statement_workbook() -> Vec<u8> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_sheet_by_name_mut("Sheet1").unwrap();
    sheet.get_cell_mut((1, 1)).set_value_string("Consolidated Income Statement");
    sheet.get_cell_mut((1, 2)).set_value_string("FY 2024");
    for (col, header) in ["Account", "Jan", "Feb", "Total"].iter().enumerate() {
        sheet.get_cell_mut((col as u32 + 1, 4)).set_value_string(*header);
    }
    sheet.get_cell_mut((1, 5)).set_value_string("Revenue");
    sheet.get_cell_mut((2, 5)).set_value_number(100);
    sheet.get_cell_mut((3, 5)).set_value_number(120);
    sheet.get_cell_mut((4, 5)).set_value_number(220);
    sheet.get_cell_mut((2, 6)).set_value_number(40);
    sheet.add_merge_cells("A1:D1");
    sheet
        .get_style_mut((4, 5))
        .get_number_format_mut()
        .set_format_code("#,##0.00");

    sheet.get_column_dimension_mut("A").set_width(40.0);
    sheet.get_row_dimension_mut(&4).set_height(30.0);
    sheet.get_style_mut((1, 4)).get_font_mut().set_bold(true);
    sheet.get_style_mut((2, 4)).set_background_color("FFFFFF00");
    sheet
        .get_style_mut((2, 4))
        .get_alignment_mut()
        .set_horizontal(HorizontalAlignmentValues::Center);
    sheet
        .get_style_mut((4, 5))
        .get_borders_mut()
        .get_bottom_mut()
        .set_border_style(Border::BORDER_THIN);

    let notes = book.new_sheet("Notes").unwrap();
    notes.get_cell_mut((1, 1)).set_value_string("Prepared by finance");
    notes.get_cell_mut((2, 1)).set_formula("Sheet1!D5*2");

    xlsx_bytes(&book)
}

fn pdf_document(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// One BT/ET block per line, gaps written as literal spaces
fn pdf_bytes(pages: &[&[&str]]) -> Vec<u8> {
    let pages = pages
        .iter()
        .map(|lines| {
            let mut operations = Vec::new();
            for (i, line) in lines.iter().enumerate() {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
                operations.push(Operation::new("Td", vec![50.into(), (800 - 14 * i as i64).into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                operations.push(Operation::new("ET", vec![]));
            }
            operations
        })
        .collect();
    pdf_document(pages)
}

/// One page, one BT/ET block per row, each cell placed with its own Td move
fn pdf_grid_bytes(rows: &[&[&str]]) -> Vec<u8> {
    let mut operations = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
        operations.push(Operation::new("Td", vec![50.into(), (700 - 16 * i as i64).into()]));
        for (j, cell) in row.iter().enumerate() {
            if j > 0 {
                operations.push(Operation::new("Td", vec![120.into(), 0.into()]));
            }
            operations.push(Operation::new("Tj", vec![Object::string_literal(*cell)]));
        }
        operations.push(Operation::new("ET", vec![]));
    }
    pdf_document(vec![operations])
}

#[test]
fn test_csv_renders_unchanged() {
    let csv = Document::new("q1.csv", b"Month,Revenue\nJan,100\nFeb,120\n".to_vec());
    let output = process_batch(&[csv]).unwrap();

    assert_eq!(output.filename, "valuation_consolidated.xlsx");
    assert_eq!(
        output.content_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let book = reopen(&output.bytes);
    assert_eq!(sheet_names(&book), vec!["q1-CSV"]);
    let sheet = book.get_sheet_by_name("q1-CSV").unwrap();
    assert_eq!(sheet.get_value((1, 1)), "Month");
    assert_eq!(sheet.get_value((2, 1)), "Revenue");
    assert_eq!(sheet.get_value((1, 2)), "Jan");
    assert_eq!(sheet.get_value((2, 2)), "100");
    assert_eq!(sheet.get_value((1, 3)), "Feb");
    assert_eq!(sheet.get_value((2, 3)), "120");
    assert!(sheet.get_cell((1, 4)).is_none());
}

#[test]
fn test_header_detected_below_title_rows() {
    let tables = SpreadsheetExtractor::new(statement_consolidator::document::SpreadsheetFormat::Xlsx)
        .extract("pl.xlsx", &statement_workbook())
        .unwrap();
    assert_eq!(tables.len(), 2);

    let normalized = TableCleaner::default().normalize(&tables[0]);
    assert_eq!(normalized.header_index, 3);
    assert_eq!(normalized.columns(), &["Account", "Jan", "Feb", "Total"]);
    assert_eq!(normalized.source_rows[0], 4);
    assert_eq!(normalized.rows()[0][0], CellValue::text("Revenue"));
    // Second data row inherits the label above it; other nulls stay null
    assert_eq!(normalized.rows()[1][0], CellValue::text("Revenue"));
    assert_eq!(normalized.rows()[1][2], CellValue::Empty);
}

#[test]
fn test_pdf_without_tables_gets_placeholder_sheet() {
    let pdf = Document::new("scan.pdf", pdf_bytes(&[&[]]));
    let output = process_batch(&[pdf]).unwrap();

    let book = reopen(&output.bytes);
    assert_eq!(sheet_names(&book), vec!["scan-PDF"]);
    let sheet = book.get_sheet_by_name("scan-PDF").unwrap();
    assert_eq!(sheet.get_value((1, 1)), "No tables detected");
    assert!(sheet.get_cell((2, 1)).is_none());
    assert!(sheet.get_cell((1, 2)).is_none());
    assert!(output.failures.is_empty());
}

#[test]
fn test_pdf_table_pages_are_numbered() {
    let pdf = Document::new(
        "annual.pdf",
        pdf_bytes(&[
            &["Annual report"],
            &["Item     2023     2024", "Revenue     10     12", "Costs     4     5"],
        ]),
    );
    let output = process_batch(&[pdf]).unwrap();

    let names: Vec<&str> = output.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["annual-p2"]);
    assert_eq!(output.sheets[0].category, Some(Category::ProfitAndLoss));

    let book = reopen(&output.bytes);
    let sheet = book.get_sheet_by_name("annual-p2").unwrap();
    assert_eq!(sheet.get_value((1, 1)), "Item");
    assert_eq!(sheet.get_value((1, 2)), "Revenue");
}

#[test]
fn test_pdf_cells_placed_by_text_moves_form_a_table() {
    let pdf = Document::new(
        "statement.pdf",
        pdf_grid_bytes(&[
            &["Item", "2023", "2024"],
            &["Revenue", "10", "12"],
            &["Costs", "4", "5"],
            &["Net income", "6", "7"],
        ]),
    );
    let output = process_batch(&[pdf]).unwrap();

    let names: Vec<&str> = output.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["statement-p1"]);
    assert_eq!(output.sheets[0].mode, RenderMode::Rendered);

    let book = reopen(&output.bytes);
    let sheet = book.get_sheet_by_name("statement-p1").unwrap();
    assert_eq!(sheet.get_value((1, 1)), "Item");
    assert_eq!(sheet.get_value((3, 1)), "2024");
    assert_eq!(sheet.get_value((1, 3)), "Costs");
    assert_eq!(sheet.get_value((1, 4)), "Net income");
    assert_eq!(sheet.get_value((3, 4)), "7");
    assert!(sheet.get_cell((4, 1)).is_none());
}

#[test]
fn test_keyword_priority_across_documents() {
    let first = Document::new("a.csv", b"Line,Amount\nRevenue,10\nTotal assets,50\n".to_vec());
    let second = Document::new("b.csv", b"Total assets,Revenue\n1,2\n".to_vec());
    let output = process_batch(&[first, second]).unwrap();

    assert_eq!(output.sheets.len(), 2);
    for sheet in &output.sheets {
        assert_eq!(sheet.category, Some(Category::ProfitAndLoss));
    }
}

#[test]
fn test_empty_batch_returns_no_files() {
    let err = process_batch(&[]).unwrap_err();
    assert!(matches!(err, ConsolidateError::NoFiles));
    assert_eq!(err.user_message(), "No files uploaded.");
}

#[test]
fn test_sheet_order_follows_submission() {
    let documents = vec![
        Document::new("z.csv", b"Item,Amount\nCash,1\n".to_vec()),
        Document::new("pl.xlsx", statement_workbook()),
        Document::new("notes.docx", b"PK".to_vec()),
        Document::new("scan.pdf", pdf_bytes(&[&[]])),
    ];
    let output = process_batch(&documents).unwrap();

    let expected = vec!["z-CSV", "pl-Sheet1", "pl-Notes", "notes-UNSUPPORTED", "scan-PDF"];
    let manifest: Vec<&str> = output.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(manifest, expected);
    assert_eq!(sheet_names(&reopen(&output.bytes)), expected);
}

#[test]
fn test_sheet_names_are_sanitized_and_unique() {
    let documents = vec![
        Document::new("Q1: [draft]?.csv", b"a,b\n1,2\n".to_vec()),
        Document::new("a very long consolidated statement filename.csv", b"a,b\n1,2\n".to_vec()),
        Document::new("dup.csv", b"a,b\n1,2\n".to_vec()),
        Document::new("DUP.csv", b"a,b\n1,2\n".to_vec()),
    ];
    let output = process_batch(&documents).unwrap();
    let names: Vec<&str> = output.sheets.iter().map(|s| s.name.as_str()).collect();

    assert_eq!(names[0], "Q1 draft-CSV");
    assert_eq!(names[1].chars().count(), 31);
    assert_eq!(names[2], "dup-CSV");
    assert_eq!(names[3], "DUP-CSV_2");
    for name in names {
        assert!(!name.chars().any(|c| ":\\/?*[]".contains(c)), "{name}");
    }
}

#[test]
fn test_style_preserving_copy_round_trips() {
    let output = process_batch(&[Document::new("pl.xlsx", statement_workbook())]).unwrap();
    assert_eq!(output.sheets[0].mode, RenderMode::Verbatim);
    assert_eq!(output.sheets[0].category, Some(Category::ProfitAndLoss));

    let original = reopen(&statement_workbook());
    let source = original.get_sheet_by_name("Sheet1").unwrap();
    let book = reopen(&output.bytes);
    let copy = book.get_sheet_by_name("pl-Sheet1").unwrap();

    for row in 1..=6 {
        for col in 1..=4 {
            assert_eq!(copy.get_value((col, row)), source.get_value((col, row)), "cell ({col}, {row})");
        }
    }
    let merges: Vec<String> = copy.get_merge_cells().iter().map(|r| r.get_range()).collect();
    assert_eq!(merges, vec!["A1:D1".to_string()]);
    let format = copy
        .get_cell((4, 5))
        .and_then(|c| c.get_style().get_number_format())
        .map(|f| f.get_format_code().to_string());
    assert_eq!(format.as_deref(), Some("#,##0.00"));

    assert_eq!(copy.get_column_dimension("A").map(|c| *c.get_width()), Some(40.0));
    assert_eq!(copy.get_row_dimension(&4).map(|r| *r.get_height()), Some(30.0));
    assert_eq!(copy.get_style((1, 4)).get_font().map(|f| *f.get_bold()), Some(true));
    let fill = copy
        .get_style((2, 4))
        .get_background_color()
        .map(|c| c.get_argb().to_string());
    assert_eq!(fill.as_deref(), Some("FFFFFF00"));
    assert_eq!(
        copy.get_style((2, 4)).get_alignment().map(|a| a.get_horizontal().clone()),
        Some(HorizontalAlignmentValues::Center)
    );
    let border = copy
        .get_style((4, 5))
        .get_borders()
        .map(|b| b.get_bottom().get_border_style().to_string());
    assert_eq!(border.as_deref(), Some(Border::BORDER_THIN));
}

#[test]
fn test_copied_formulas_point_at_renamed_sheets() {
    let output = process_batch(&[Document::new("pl.xlsx", statement_workbook())]).unwrap();
    let names: Vec<&str> = output.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["pl-Sheet1", "pl-Notes"]);

    let book = reopen(&output.bytes);
    let notes = book.get_sheet_by_name("pl-Notes").unwrap();
    assert_eq!(notes.get_cell((2, 1)).unwrap().get_formula(), "'pl-Sheet1'!D5*2");
}

#[test]
fn test_corrupt_and_unsupported_files_do_not_abort() {
    let documents = vec![
        Document::new("broken.xlsx", b"definitely not a zip".to_vec()),
        Document::new("notes.docx", b"hello".to_vec()),
        Document::new("ok.csv", b"Item,Amount\nCash,1\n".to_vec()),
    ];
    let output = process_batch(&documents).unwrap();

    let names: Vec<&str> = output.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["broken-UNSUPPORTED", "notes-UNSUPPORTED", "ok-CSV"]);
    assert_eq!(output.sheets[0].mode, RenderMode::Placeholder);

    let stages: Vec<FailureStage> = output.failures.iter().map(|f| f.stage).collect();
    assert_eq!(stages, vec![FailureStage::Extraction, FailureStage::Dispatch]);
    assert_eq!(output.failures[0].filename, "broken.xlsx");

    let book = reopen(&output.bytes);
    let notes = book.get_sheet_by_name("notes-UNSUPPORTED").unwrap();
    assert_eq!(notes.get_value((1, 1)), "Unsupported file type: notes.docx");
}

#[test]
fn test_summary_sheet_lists_categories() {
    let mut config = ConsolidatorConfig::default();
    config.output.summary_sheet = true;
    let documents = vec![
        Document::new("cash.csv", b"Operating activities,Amount\nReceipts,5\n".to_vec()),
        Document::new("misc.csv", b"Name,Value\nx,1\n".to_vec()),
    ];
    let output = BatchProcessor::new(config).unwrap().process_batch(&documents).unwrap();

    let book = reopen(&output.bytes);
    assert_eq!(sheet_names(&book), vec!["cash-CSV", "misc-CSV", "Summary"]);
    let summary = book.get_sheet_by_name("Summary").unwrap();
    assert_eq!(summary.get_value((1, 1)), "Sheet");
    assert_eq!(summary.get_value((1, 2)), "cash-CSV");
    assert_eq!(summary.get_value((4, 2)), "Cash Flow");
    assert_eq!(summary.get_value((4, 3)), "Other");
}
