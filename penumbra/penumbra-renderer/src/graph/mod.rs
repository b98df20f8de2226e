//! Pass dependency graph: explicit edges, deterministic topological order.

use crate::error::RenderError;

/// Declaration order is the tie-break when several passes are ready at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    Shadow,
    GBuffer,
    ReflectionTop,
    ReflectionBottom,
    /// Deferred lighting to the surface.
    Composite,
    /// Debug blit of one buffer to the surface.
    Present,
}

impl PassKind {
    pub fn name(self) -> &'static str {
        match self {
            PassKind::Shadow => "shadow",
            PassKind::GBuffer => "gbuffer",
            PassKind::ReflectionTop => "reflection_top",
            PassKind::ReflectionBottom => "reflection_bottom",
            PassKind::Composite => "composite",
            PassKind::Present => "present",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PassGraph {
    passes: Vec<PassKind>,
    edges: Vec<(PassKind, PassKind)>,
}

impl PassGraph {
    pub fn new() -> Self { Self::default() }

    pub fn add_pass(&mut self, pass: PassKind) {
        if !self.passes.contains(&pass) {
            self.passes.push(pass);
        }
    }

    /// `after` may only run once `before` has completed.
    pub fn add_edge(&mut self, before: PassKind, after: PassKind) {
        self.edges.push((before, after));
    }

    pub fn passes(&self) -> &[PassKind] { &self.passes }

    pub fn dependencies(&self, pass: PassKind) -> impl Iterator<Item = PassKind> + '_ {
        self.edges.iter().filter(move |(_, b)| *b == pass).map(|(a, _)| *a)
    }

    /// The graph for one frame. `output` is the pass that writes the surface:
    /// [`PassKind::Composite`] for lit views, [`PassKind::Present`] for buffer views.
    pub fn for_frame(reflections: bool, output: PassKind) -> Self {
        let mut g = Self::new();
        g.add_pass(PassKind::Shadow);
        g.add_pass(PassKind::GBuffer);
        // Frame order is fixed: the G-buffer pass always follows the shadow pass.
        g.add_edge(PassKind::Shadow, PassKind::GBuffer);
        g.add_pass(output);
        g.add_edge(PassKind::Shadow, output);
        g.add_edge(PassKind::GBuffer, output);
        if reflections && output == PassKind::Composite {
            for side in [PassKind::ReflectionTop, PassKind::ReflectionBottom] {
                g.add_pass(side);
                g.add_edge(PassKind::Shadow, side);
                g.add_edge(side, PassKind::Composite);
            }
        }
        g
    }

    pub fn topological_order(&self) -> Result<Vec<PassKind>, RenderError> {
        for &(a, b) in &self.edges {
            if !self.passes.contains(&a) || !self.passes.contains(&b) {
                return Err(RenderError::PassOrder(format!(
                    "edge {} -> {} names a pass not in the graph",
                    a.name(),
                    b.name()
                )));
            }
        }
        let n = self.passes.len();
        let index = |p: PassKind| self.passes.iter().position(|&q| q == p).unwrap_or(n);
        let mut in_degree = vec![0usize; n];
        let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(a, b) in &self.edges {
            let (a, b) = (index(a), index(b));
            in_degree[b] += 1;
            out_edges[a].push(b);
        }
        let mut ready: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while !ready.is_empty() {
            // smallest PassKind first
            ready.sort_by_key(|&i| std::cmp::Reverse(self.passes[i]));
            let Some(u) = ready.pop() else { break };
            order.push(self.passes[u]);
            for &v in &out_edges[u] {
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    ready.push(v);
                }
            }
        }
        if order.len() != n {
            return Err(RenderError::PassOrder("pass graph has a cycle".to_string()));
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_frame_order_with_reflections() {
        let order = PassGraph::for_frame(true, PassKind::Composite).topological_order().unwrap();
        assert_eq!(
            order,
            vec![
                PassKind::Shadow,
                PassKind::GBuffer,
                PassKind::ReflectionTop,
                PassKind::ReflectionBottom,
                PassKind::Composite
            ]
        );
    }

    #[test]
    fn lit_frame_order_without_reflections() {
        let order = PassGraph::for_frame(false, PassKind::Composite).topological_order().unwrap();
        assert_eq!(order, vec![PassKind::Shadow, PassKind::GBuffer, PassKind::Composite]);
    }

    #[test]
    fn debug_view_skips_reflections() {
        let order = PassGraph::for_frame(true, PassKind::Present).topological_order().unwrap();
        assert_eq!(order, vec![PassKind::Shadow, PassKind::GBuffer, PassKind::Present]);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut g = PassGraph::new();
        g.add_pass(PassKind::Composite);
        g.add_pass(PassKind::GBuffer);
        g.add_pass(PassKind::Shadow);
        g.add_edge(PassKind::GBuffer, PassKind::Composite);
        g.add_edge(PassKind::Shadow, PassKind::Composite);
        let order = g.topological_order().unwrap();
        assert_eq!(order, vec![PassKind::Shadow, PassKind::GBuffer, PassKind::Composite]);
    }

    #[test]
    fn cycle_is_an_error() {
        let mut g = PassGraph::new();
        g.add_pass(PassKind::Shadow);
        g.add_pass(PassKind::GBuffer);
        g.add_edge(PassKind::Shadow, PassKind::GBuffer);
        g.add_edge(PassKind::GBuffer, PassKind::Shadow);
        assert!(matches!(g.topological_order(), Err(RenderError::PassOrder(_))));
    }

    #[test]
    fn dangling_edge_is_an_error() {
        let mut g = PassGraph::new();
        g.add_pass(PassKind::Composite);
        g.add_edge(PassKind::GBuffer, PassKind::Composite);
        assert!(g.topological_order().is_err());
    }

    #[test]
    fn gbuffer_waits_for_shadow_in_every_frame_graph() {
        for (reflections, output) in [(true, PassKind::Composite), (false, PassKind::Composite), (true, PassKind::Present)] {
            let g = PassGraph::for_frame(reflections, output);
            assert_eq!(g.dependencies(PassKind::GBuffer).collect::<Vec<_>>(), vec![PassKind::Shadow]);
        }
    }

    #[test]
    fn dependencies_are_listed() {
        let g = PassGraph::for_frame(true, PassKind::Composite);
        let mut deps: Vec<PassKind> = g.dependencies(PassKind::Composite).collect();
        deps.sort();
        assert_eq!(
            deps,
            vec![PassKind::Shadow, PassKind::GBuffer, PassKind::ReflectionTop, PassKind::ReflectionBottom]
        );
    }
}
