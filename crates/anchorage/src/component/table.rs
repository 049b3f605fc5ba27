//! Table Widget
//!
//! Cells are addressed by 1-based line and column inside one of the three
//! table sections. Single cells are located as unique elements and heal
//! after staleness; whole-section enumerations are multi-result and must be
//! enumerated again when the table is rebuilt.

use super::{ComponentCore, Locatable};
use crate::element::ElementProxy;
use crate::locator::Locator;
use crate::result::{AnchorageError, AnchorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Section of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableSection {
    /// `thead`
    Head,
    /// `tbody`
    Body,
    /// `tfoot`
    Foot,
}

impl TableSection {
    /// Section element tag
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Head => "thead",
            Self::Body => "tbody",
            Self::Foot => "tfoot",
        }
    }

    fn rows_xpath(self) -> String {
        format!(".//{}/tr", self.tag())
    }

    fn cell_xpath(self, coordinate: Coordinate) -> String {
        format!(
            ".//{}/tr[{}]/*[{}]",
            self.tag(),
            coordinate.line,
            coordinate.column
        )
    }
}

/// 1-based position of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Line, from 1
    pub line: usize,
    /// Column, from 1
    pub column: usize,
}

impl Coordinate {
    /// Coordinate at `line`, `column`; both must be at least 1
    pub fn new(line: usize, column: usize) -> AnchorageResult<Self> {
        if line == 0 || column == 0 {
            return Err(AnchorageError::InvalidCoordinate {
                message: format!("({line}, {column}) is not 1-based"),
            });
        }
        Ok(Self { line, column })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.line, self.column)
    }
}

/// One `th` or `td`
#[derive(Debug, Clone)]
pub struct Cell {
    element: ElementProxy,
    coordinate: Coordinate,
}

impl Cell {
    /// Position inside its section
    #[must_use]
    pub const fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    /// Underlying element
    #[must_use]
    pub fn element(&self) -> &ElementProxy {
        &self.element
    }

    /// Rendered text
    pub fn text(&self) -> AnchorageResult<String> {
        self.element.text()
    }

    /// Click the cell
    pub fn click(&self) -> AnchorageResult<()> {
        self.element.click()
    }
}

/// `table`
#[derive(Debug)]
pub struct Table {
    core: ComponentCore,
}

impl Table {
    /// Body cell at 1-based `line`, `column`
    pub fn cell(&mut self, line: usize, column: usize) -> AnchorageResult<Cell> {
        self.cell_in(TableSection::Body, Coordinate::new(line, column)?)
    }

    /// Head cell at 1-based `column` of the first head line
    pub fn head_cell(&mut self, column: usize) -> AnchorageResult<Cell> {
        self.cell_in(TableSection::Head, Coordinate::new(1, column)?)
    }

    /// Foot cell at 1-based `column` of the first foot line
    pub fn foot_cell(&mut self, column: usize) -> AnchorageResult<Cell> {
        self.cell_in(TableSection::Foot, Coordinate::new(1, column)?)
    }

    /// Cell of `section` at `coordinate`
    pub fn cell_in(&mut self, section: TableSection, coordinate: Coordinate) -> AnchorageResult<Cell> {
        let table = self.element()?;
        let locator = Locator::xpath(section.cell_xpath(coordinate))?;
        match table.find_element(&locator) {
            Ok(element) => Ok(Cell { element, coordinate }),
            Err(AnchorageError::ElementNotFound { .. }) => Err(AnchorageError::InvalidCoordinate {
                message: format!("no cell at {coordinate} in <{}>", section.tag()),
            }),
            Err(err) => Err(err),
        }
    }

    /// Every cell of `section`, line by line
    pub fn cells_by_line(&mut self, section: TableSection) -> AnchorageResult<Vec<Vec<Cell>>> {
        let table = self.element()?;
        let rows = table.find_elements(&Locator::xpath(section.rows_xpath())?)?;
        let any = Locator::xpath("./*")?;

        let mut lines = Vec::with_capacity(rows.len());
        for (l, row) in rows.iter().enumerate() {
            let mut line = Vec::new();
            for element in row.find_elements(&any)? {
                if !matches!(element.tag_name()?.as_str(), "th" | "td") {
                    continue;
                }
                let coordinate = Coordinate {
                    line: l + 1,
                    column: line.len() + 1,
                };
                line.push(Cell { element, coordinate });
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Every cell of `section`, column by column
    ///
    /// Lines shorter than others simply contribute nothing to the missing
    /// columns.
    pub fn cells_by_column(&mut self, section: TableSection) -> AnchorageResult<Vec<Vec<Cell>>> {
        let lines = self.cells_by_line(section)?;
        let width = lines.iter().map(Vec::len).max().unwrap_or(0);
        let mut columns: Vec<Vec<Cell>> = (0..width).map(|_| Vec::new()).collect();
        for line in lines {
            for (c, cell) in line.into_iter().enumerate() {
                columns[c].push(cell);
            }
        }
        Ok(columns)
    }

    /// Body line at 1-based `index`
    pub fn line_cells(&mut self, index: usize) -> AnchorageResult<Vec<Cell>> {
        let lines = self.cells_by_line(TableSection::Body)?;
        take_nth(lines, index, "line")
    }

    /// Body column at 1-based `index`
    pub fn column_cells(&mut self, index: usize) -> AnchorageResult<Vec<Cell>> {
        let columns = self.cells_by_column(TableSection::Body)?;
        take_nth(columns, index, "column")
    }
}

fn take_nth(groups: Vec<Vec<Cell>>, index: usize, what: &str) -> AnchorageResult<Vec<Cell>> {
    let count = groups.len();
    index
        .checked_sub(1)
        .and_then(|i| groups.into_iter().nth(i))
        .ok_or_else(|| AnchorageError::InvalidCoordinate {
            message: format!("{what} {index} outside 1..={count}"),
        })
}

locatable_widget!(Table);

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::component::Widget;
    use crate::mock::{fixtures, MockBackend};
    use crate::session::{Session, SessionConfig};
    use crate::wait::WaitOptions;
    use std::sync::Arc;

    fn setup() -> (Arc<MockBackend>, Table) {
        let backend = Arc::new(MockBackend::new(fixtures::table_page()));
        let config = SessionConfig::default()
            .with_wait(WaitOptions::new().with_timeout(200).with_poll_interval(10));
        let session = Session::with_config(backend.clone(), config);
        let mut table = Table::new(session);
        table.load_by_id("tableId").unwrap();
        (backend, table)
    }

    fn texts(cells: &[Cell]) -> Vec<String> {
        cells.iter().map(|cell| cell.text().unwrap()).collect()
    }

    mod coordinate_tests {
        use super::*;

        #[test]
        fn test_zero_is_rejected() {
            assert!(Coordinate::new(0, 1).is_err());
            assert!(Coordinate::new(1, 0).is_err());
            assert_eq!(Coordinate::new(2, 3).unwrap().to_string(), "(2, 3)");
        }
    }

    mod cell_tests {
        use super::*;

        #[test]
        fn test_single_cells() {
            let (_backend, mut table) = setup();
            assert_eq!(table.cell(2, 3).unwrap().text().unwrap(), "data 2,3");
            assert_eq!(table.head_cell(1).unwrap().text().unwrap(), "head 1");
            assert_eq!(table.foot_cell(3).unwrap().text().unwrap(), "foot 3");
            assert_eq!(table.cell(1, 2).unwrap().coordinate(), Coordinate { line: 1, column: 2 });
        }

        #[test]
        fn test_out_of_range_cell() {
            let (_backend, mut table) = setup();
            assert!(matches!(table.cell(4, 1), Err(AnchorageError::InvalidCoordinate { .. })));
            assert!(matches!(table.cell(0, 1), Err(AnchorageError::InvalidCoordinate { .. })));
            assert!(matches!(table.head_cell(4), Err(AnchorageError::InvalidCoordinate { .. })));
        }

        #[test]
        fn test_single_cell_survives_reload() {
            let (backend, mut table) = setup();
            let cell = table.cell(3, 1).unwrap();
            backend.reload_page();
            assert_eq!(cell.text().unwrap(), "data 3,1");
        }
    }

    mod enumeration_tests {
        use super::*;

        #[test]
        fn test_cells_by_line() {
            let (_backend, mut table) = setup();
            let lines = table.cells_by_line(TableSection::Body).unwrap();
            assert_eq!(lines.len(), 3);
            assert_eq!(texts(&lines[1]), vec!["data 2,1", "data 2,2", "data 2,3"]);
            assert_eq!(lines[2][0].coordinate(), Coordinate { line: 3, column: 1 });
        }

        #[test]
        fn test_cells_by_column() {
            let (_backend, mut table) = setup();
            let columns = table.cells_by_column(TableSection::Body).unwrap();
            assert_eq!(columns.len(), 3);
            assert_eq!(texts(&columns[2]), vec!["data 1,3", "data 2,3", "data 3,3"]);

            let head = table.cells_by_column(TableSection::Head).unwrap();
            assert_eq!(texts(&head[0]), vec!["head 1"]);
        }

        #[test]
        fn test_line_and_column_are_one_based() {
            let (_backend, mut table) = setup();
            assert_eq!(texts(&table.line_cells(1).unwrap()), vec!["data 1,1", "data 1,2", "data 1,3"]);
            assert_eq!(texts(&table.column_cells(2).unwrap()), vec!["data 1,2", "data 2,2", "data 3,2"]);
            assert!(matches!(table.line_cells(0), Err(AnchorageError::InvalidCoordinate { .. })));
            assert!(matches!(table.column_cells(4), Err(AnchorageError::InvalidCoordinate { .. })));
        }

        #[test]
        fn test_enumerated_cells_go_stale() {
            let (backend, mut table) = setup();
            let lines = table.cells_by_line(TableSection::Foot).unwrap();
            backend.reload_page();
            assert!(matches!(
                lines[0][0].text(),
                Err(AnchorageError::StaleMultiResult { .. })
            ));
        }
    }
}
