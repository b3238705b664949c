//! Text, DOT and SVG views of a fitted tree.
//! Everything here is built from [`TreeModel::preorder`].
use colored::Colorize;
use plotters::prelude::*;

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, TreeError};
use super::model::{NodeView, TreeModel};


const WIDTH: usize = 10;
const FULL_WIDTH: usize = 58;

const BOX_HALF_WIDTH: i32 = 62;
const BOX_HALF_HEIGHT: i32 = 20;
const MARGIN: i32 = 40;
const FONT_SIZE: i32 = 12;


#[inline]
fn render_error<E: fmt::Display>(error: E) -> TreeError {
    TreeError::Render { message: error.to_string() }
}


impl TreeModel {
    /// Returns the tree in the DOT language.
    pub fn to_dot(&self) -> String {
        let views = self.preorder();
        let mut dot = String::from("graph DecisionTree {\n");

        for view in views.iter() {
            let shape = if view.node.is_leaf() { ", shape = box" } else { "" };
            dot.push_str(&format!(
                "\tnode_{id} [ label = \"{pred}\\nn = {n}, {pct:.1}%\"{shape} ];\n",
                id = view.id,
                pred = view.node.prediction,
                n = view.node.n_obs,
                pct = view.percent,
            ));
        }

        for view in views.iter() {
            let Some(branch) = &view.node.branch else { continue; };
            for child in [branch.left, branch.right] {
                let label = views[child.0].condition.replace('"', "\\\"");
                dot.push_str(&format!(
                    "\tnode_{} -- node_{child} [ label = \"{label}\" ];\n",
                    view.id,
                ));
            }
        }

        dot.push('}');
        dot
    }


    /// Write the current decision tree to dot file.
    #[inline]
    pub fn to_dot_file<P>(&self, path: P) -> Result<()>
        where P: AsRef<Path>
    {
        let mut f = File::create(path)?;
        f.write_all(self.to_dot().as_bytes())?;
        Ok(())
    }


    /// Draw the tree into an SVG file of `size` pixels.
    ///
    /// Leaves are spread evenly in pre-order,
    /// each decision node sits above the middle of its children.
    pub fn render_svg<P>(&self, path: P, size: (u32, u32)) -> Result<()>
        where P: AsRef<Path>
    {
        let views = self.preorder();
        let coords = self.layout(&views[..], size);

        let area = SVGBackend::new(path.as_ref(), size).into_drawing_area();
        area.fill(&WHITE).map_err(render_error)?;

        for view in views.iter() {
            let Some(branch) = &view.node.branch else { continue; };
            let (px, py) = coords[view.id.0];
            for child in [branch.left, branch.right] {
                let (cx, cy) = coords[child.0];
                area.draw(&PathElement::new(
                    vec![(px, py + BOX_HALF_HEIGHT), (cx, cy - BOX_HALF_HEIGHT)],
                    BLACK.stroke_width(1),
                )).map_err(render_error)?;

                let label = &views[child.0].condition;
                let (lx, ly) = ((px + cx) / 2, (py + cy) / 2);
                area.draw(&Text::new(
                    label.clone(),
                    (lx, ly),
                    ("sans-serif", FONT_SIZE).into_font().color(&BLUE),
                )).map_err(render_error)?;
            }
        }

        for view in views.iter() {
            let (x, y) = coords[view.id.0];
            let corners = [
                (x - BOX_HALF_WIDTH, y - BOX_HALF_HEIGHT),
                (x + BOX_HALF_WIDTH, y + BOX_HALF_HEIGHT),
            ];
            let fill = if view.node.is_leaf() {
                RGBColor(230, 240, 255).filled()
            } else {
                WHITE.filled()
            };
            area.draw(&Rectangle::new(corners, fill))
                .map_err(render_error)?;
            area.draw(&Rectangle::new(corners, BLACK.stroke_width(1)))
                .map_err(render_error)?;

            let lines = [
                view.node.prediction.to_string(),
                format!("{:.1}%", view.percent),
            ];
            for (k, line) in lines.into_iter().enumerate() {
                let ty = y - BOX_HALF_HEIGHT + 4 + k as i32 * (FONT_SIZE + 4);
                area.draw(&Text::new(
                    line,
                    (x - BOX_HALF_WIDTH + 4, ty),
                    ("sans-serif", FONT_SIZE).into_font(),
                )).map_err(render_error)?;
            }
        }

        area.present().map_err(render_error)?;
        Ok(())
    }


    /// Pixel position of every node.
    fn layout(&self, views: &[NodeView<'_>], size: (u32, u32)) -> Vec<(i32, i32)> {
        let (width, height) = (size.0 as i32, size.1 as i32);
        let n_leaves = self.n_leaves().max(1) as i32;
        let depth = self.depth().max(1) as i32;

        let step_x = (width - 2 * MARGIN).max(1) / n_leaves;
        let step_y = (height - 2 * MARGIN - 2 * BOX_HALF_HEIGHT).max(1) / depth;

        let mut coords = vec![(0, 0); views.len()];
        let mut next_leaf = 0;
        for view in views.iter() {
            let y = MARGIN + BOX_HALF_HEIGHT + view.depth as i32 * step_y;
            if view.node.is_leaf() {
                let x = MARGIN + next_leaf * step_x + step_x / 2;
                coords[view.id.0] = (x, y);
                next_leaf += 1;
            } else {
                coords[view.id.0].1 = y;
            }
        }

        // Children come after their parent in pre-order.
        for view in views.iter().rev() {
            if let Some(branch) = &view.node.branch {
                let x = (coords[branch.left.0].0 + coords[branch.right.0].0) / 2;
                coords[view.id.0].0 = x;
            }
        }
        coords
    }


    /// Print the complexity-parameter table.
    pub fn print_cp_table(&self) {
        println!(
            "{:=>FULL_WIDTH$}\n{:^FULL_WIDTH$}\n{:->FULL_WIDTH$}",
            "", "CP TABLE".bold(), "",
        );
        println!(
            "{:>WIDTH$} {:>7} {:>WIDTH$} {:>WIDTH$} {:>WIDTH$}",
            "CP".bold().red(),
            "NSPLIT".bold().blue(),
            "REL ERROR".bold().green(),
            "XERROR".bold().yellow(),
            "XSTD".bold().cyan(),
        );
        for entry in self.cp_table.iter() {
            println!("{entry}");
        }
        println!("{:=>FULL_WIDTH$}", "");
    }
}


/// A text summary, one line per node in pre-order:
/// `id) condition n weight deviance prediction`,
/// leaves marked with `*`.
impl fmt::Display for TreeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let root = self.root();
        writeln!(f, "n = {} (weight {})\n", root.n_obs, root.weight)?;
        writeln!(f, "node), split, n, weight, deviance, prediction")?;
        writeln!(f, "      * denotes terminal node\n")?;

        for view in self.preorder() {
            let node = view.node;
            let indent = "  ".repeat(view.depth);
            let star = if node.is_leaf() { " *" } else { "" };
            writeln!(
                f,
                "{indent}{}) {} {} {} {:.4} {}{star}",
                view.id.0 + 1,
                view.condition,
                node.n_obs,
                node.weight,
                node.deviance,
                node.prediction,
            )?;
        }
        Ok(())
    }
}
