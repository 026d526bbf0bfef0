//! 控制台输出
//!
//! 以制表符分隔的单元格按列右对齐输出，列宽随已输出的最宽单元格增长

use std::io::Write;
use std::sync::Mutex;

/// 列之间的最小间隔
const CELL_PADDING: usize = 1;

struct ConsoleState<W> {
    out: W,
    widths: Vec<usize>,
}

/// 按列对齐的行输出器，每行一次写入，多任务并发写入时不会交错
pub struct ConsoleWriter<W: Write + Send> {
    state: Mutex<ConsoleState<W>>,
}

impl<W: Write + Send> ConsoleWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                out,
                widths: Vec::new(),
            }),
        }
    }

    /// 输出一行，`\t` 分隔的单元格除最后一个外都按列右对齐
    pub fn write_row(&self, line: &str) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let cells: Vec<&str> = line.split('\t').map(str::trim).collect();
        let aligned = cells.len().saturating_sub(1);

        for (index, cell) in cells.iter().take(aligned).enumerate() {
            let width = cell.chars().count();
            match state.widths.get_mut(index) {
                Some(existing) => *existing = (*existing).max(width),
                None => state.widths.push(width),
            }
        }

        let mut rendered = String::with_capacity(line.len() + aligned * CELL_PADDING);
        for (index, cell) in cells.iter().enumerate() {
            if index < aligned {
                let width = state.widths[index];
                rendered.push_str(&format!("{cell:>width$}"));
                rendered.push_str(&" ".repeat(CELL_PADDING));
            } else {
                rendered.push_str(cell);
            }
        }
        rendered.push('\n');

        state.out.write_all(rendered.as_bytes())?;
        state.out.flush()
    }

    /// 输出空行
    pub fn write_blank(&self) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.out.write_all(b"\n")?;
        state.out.flush()
    }

    /// 原样输出一行，不参与列对齐
    pub fn write_plain(&self, line: &str) -> std::io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(state.out, "{line}")?;
        state.out.flush()
    }
}
