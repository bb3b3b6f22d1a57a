//! Parse trees and the predictive parse driver.

pub mod ll1;

use std::io::{self, Write};

use crate::grammar::Symbol;
use crate::token::Token;

pub use ll1::{parse, ParseError};

pub type NodeId = usize;

#[derive(Debug, Clone)]
struct Node {
    symbol: Symbol,
    token: Option<Token>,
    children: Vec<NodeId>,
}

/// An N-ary parse tree stored as an arena of nodes addressed by [`NodeId`].
///
/// Node 0 is the root. A node carries its grammar symbol, the matched token
/// when the symbol is a terminal, and its children in left-to-right order.
/// Handles stay valid for the life of the tree; nodes are never removed.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    pub fn new(root: Symbol) -> Self {
        Self {
            nodes: vec![Node { symbol: root, token: None, children: Vec::new() }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn symbol(&self, node: NodeId) -> Symbol {
        self.nodes[node].symbol
    }

    pub fn token(&self, node: NodeId) -> Option<Token> {
        self.nodes[node].token
    }

    pub fn set_token(&mut self, node: NodeId, token: Token) {
        self.nodes[node].token = Some(token);
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.nodes[node].children.len()
    }

    pub fn child(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[node].children.get(index).copied()
    }

    /// The first direct child carrying `symbol`.
    pub fn find_child(&self, node: NodeId, symbol: Symbol) -> Option<NodeId> {
        self.nodes[node]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].symbol == symbol)
    }

    pub fn add_child(&mut self, parent: NodeId, symbol: Symbol) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node { symbol, token: None, children: Vec::new() });
        self.nodes[parent].children.push(id);
        id
    }

    /// Indented pre-order dump, one node per line; terminal nodes include
    /// their token's semantic index.
    pub fn serialize_to<W: Write>(
        &self,
        w: &mut W,
        symbol_name: &dyn Fn(Symbol) -> String,
    ) -> io::Result<()> {
        self.write_node(w, self.root(), symbol_name, 0)
    }

    fn write_node<W: Write>(
        &self,
        w: &mut W,
        node: NodeId,
        symbol_name: &dyn Fn(Symbol) -> String,
        depth: usize,
    ) -> io::Result<()> {
        for _ in 0..depth {
            w.write_all(b"|")?;
        }
        write!(w, "{}", symbol_name(self.nodes[node].symbol))?;
        if let Some(token) = self.nodes[node].token {
            write!(w, " with token seman {}", token.seman)?;
        }
        writeln!(w)?;

        for &child in &self.nodes[node].children {
            self.write_node(w, child, symbol_name, depth + 1)?;
        }
        Ok(())
    }
}
