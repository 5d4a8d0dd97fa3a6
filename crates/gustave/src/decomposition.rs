//! C5 — `DepthDecomposition` → `LayerDecomposition` → `LayerStructure`, plus
//! the cluster-granularity sibling used by C7 (spec.md §3/§4.4/§4.5).
//!
//! A **layer** groups equal-depth, contact-connected nodes and additionally
//! absorbs any higher-depth layer that turns out to be supported only
//! through it, so that layers form a clean bottom-up chain the layer pass
//! can walk in a single ascending sweep. A **cluster** is the same
//! equal-depth/contact-connected grouping *without* that merge — finer and
//! more numerous than layers, used as the mid-granularity preconditioner of
//! §4.5.

use num_traits::Float;

use crate::f1_structure::F1Structure;
use crate::graph::NodeIndex;

pub(crate) type LayerIndex = usize;
pub(crate) type ClusterIndex = usize;

/// A contact pointing from a member of a layer/cluster down to a node in a
/// strictly lower depth (spec.md §3's "lowContacts" array).
#[derive(Debug, Clone, Copy)]
pub(crate) struct LowerContact<F> {
    pub upper_node_id: NodeIndex,
    pub other_node_id: NodeIndex,
    pub cond_plus: F,
    pub cond_minus: F,
}

/// Multi-source BFS from every foundation node (spec.md §3 "Depth").
pub(crate) struct DepthDecomposition {
    pub depth_of_node: Vec<Option<usize>>,
    pub nodes_at_depth: Vec<Vec<NodeIndex>>,
    pub reached_count: usize,
}

impl DepthDecomposition {
    pub fn compute<F: Float>(f_structure: &F1Structure<F>, structure: &crate::graph::Structure<F>) -> Self {
        let n = structure.node_count();
        let mut depth_of_node: Vec<Option<usize>> = vec![None; n];
        let mut nodes_at_depth: Vec<Vec<NodeIndex>> = Vec::new();
        let mut reached_count = 0usize;

        let foundations: Vec<NodeIndex> = (0..n).filter(|&i| structure.node(i).is_foundation).collect();
        for &id in &foundations {
            depth_of_node[id] = Some(0);
        }
        reached_count += foundations.len();
        let mut frontier = foundations;
        if !frontier.is_empty() {
            nodes_at_depth.push(frontier.clone());
        }

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &id in &frontier {
                for contact in f_structure.contacts(id) {
                    let other = contact.other_node_id;
                    if depth_of_node[other].is_none() {
                        depth_of_node[other] = Some(nodes_at_depth.len());
                        next.push(other);
                        reached_count += 1;
                    }
                }
            }
            if !next.is_empty() {
                nodes_at_depth.push(next.clone());
            }
            frontier = next;
        }

        Self {
            depth_of_node,
            nodes_at_depth,
            reached_count,
        }
    }
}

struct RawLayer<F> {
    nodes: Vec<NodeIndex>,
    low_contacts: Vec<LowerContact<F>>,
    cumulated_weight: F,
    /// Set once this layer has been absorbed into a strictly-lower one,
    /// naming the absorbing layer. Distinct from the final `Layer`'s
    /// `low_layer_id`, which names the layer *beneath* a surviving one.
    merged_into: Option<LayerIndex>,
}

/// Groups equal-depth, contact-connected nodes into layers, merging in any
/// higher layer whose support turns out to pass through the new layer
/// (spec.md §3 "Layer").
pub(crate) struct LayerDecomposition<F> {
    raw_layers: Vec<RawLayer<F>>,
    layer_of_node_raw: Vec<Option<LayerIndex>>,
}

impl<F: Float> LayerDecomposition<F> {
    pub fn compute(f_structure: &F1Structure<F>, depth: &DepthDecomposition) -> Self {
        let n = depth.depth_of_node.len();
        let mut raw_layers: Vec<RawLayer<F>> = Vec::new();
        let mut layer_of_node_raw: Vec<Option<LayerIndex>> = vec![None; n];

        // Process from the highest depth down to 0 so that, by the time a
        // layer at depth d is built, every layer at depth > d already
        // exists and can be merged into it.
        for depth_nodes in depth.nodes_at_depth.iter().rev() {
            for &root in depth_nodes {
                if layer_of_node_raw[root].is_some() {
                    continue;
                }
                let layer_id = raw_layers.len();
                raw_layers.push(RawLayer {
                    nodes: Vec::new(),
                    low_contacts: Vec::new(),
                    cumulated_weight: F::zero(),
                    merged_into: None,
                });

                let mut stack = vec![root];
                layer_of_node_raw[root] = Some(layer_id);
                while let Some(node_id) = stack.pop() {
                    raw_layers[layer_id].nodes.push(node_id);
                    raw_layers[layer_id].cumulated_weight =
                        raw_layers[layer_id].cumulated_weight + f_structure.weight(node_id);
                    let node_depth = depth.depth_of_node[node_id].expect("explored node must be reached");

                    for contact in f_structure.contacts(node_id) {
                        let other = contact.other_node_id;
                        let other_depth = match depth.depth_of_node[other] {
                            Some(d) => d,
                            None => continue,
                        };

                        if other_depth == node_depth {
                            if layer_of_node_raw[other].is_none() {
                                layer_of_node_raw[other] = Some(layer_id);
                                stack.push(other);
                            }
                        } else if other_depth < node_depth {
                            raw_layers[layer_id].low_contacts.push(LowerContact {
                                upper_node_id: node_id,
                                other_node_id: other,
                                cond_plus: contact.cond_plus,
                                cond_minus: contact.cond_minus,
                            });
                        } else {
                            // other_depth > node_depth: other belongs to an
                            // already-built higher layer. If that layer has
                            // no support yet, this layer is it: merge.
                            let other_layer_id = layer_of_node_raw[other]
                                .expect("higher-depth node must already be placed");
                            if other_layer_id != layer_id
                                && raw_layers[other_layer_id].merged_into.is_none()
                            {
                                merge_layer(&mut raw_layers, &mut layer_of_node_raw, other_layer_id, layer_id);
                            }
                        }
                    }
                }
            }
        }

        // A layer's low_contacts were recorded before the target node's own
        // layer was necessarily known (lower depths are built later, and
        // merges can fold a contact's target into the very layer recording
        // it). Drop any that, now that every node has a final layer, turn
        // out to point back inside their own layer — those are internal,
        // not a contact to the layer below (spec.md §3 "LayerStructure").
        let raw_count = raw_layers.len();
        for layer_id in 0..raw_count {
            raw_layers[layer_id]
                .low_contacts
                .retain(|c| layer_of_node_raw[c.other_node_id] != Some(layer_id));
        }

        Self {
            raw_layers,
            layer_of_node_raw,
        }
    }
}

/// Absorbs `other_layer_id`'s nodes, weight, and lower contacts into
/// `into_layer_id`. `other_layer_id`'s members were already fully explored
/// when it was built (their own same-depth/lower contacts are already
/// recorded), so this is pure bookkeeping — nothing needs re-exploring.
fn merge_layer<F: Float>(
    raw_layers: &mut [RawLayer<F>],
    layer_of_node_raw: &mut [Option<LayerIndex>],
    other_layer_id: LayerIndex,
    into_layer_id: LayerIndex,
) {
    raw_layers[other_layer_id].merged_into = Some(into_layer_id);
    let merged_weight = raw_layers[other_layer_id].cumulated_weight;
    raw_layers[into_layer_id].cumulated_weight = raw_layers[into_layer_id].cumulated_weight + merged_weight;

    let merged_nodes = raw_layers[other_layer_id].nodes.clone();
    for &node in &merged_nodes {
        layer_of_node_raw[node] = Some(into_layer_id);
    }
    raw_layers[into_layer_id].nodes.extend(merged_nodes);
    let merged_low_contacts = std::mem::take(&mut raw_layers[other_layer_id].low_contacts);
    raw_layers[into_layer_id].low_contacts.extend(merged_low_contacts);
}

pub(crate) struct Layer<F> {
    pub low_contacts: Vec<LowerContact<F>>,
    pub cumulated_weight: F,
    /// The id of the lowest layer directly beneath this one, `None` for a
    /// foundation layer (spec.md §3 "LayerStructure").
    pub low_layer_id: Option<LayerIndex>,
}

impl<F: Float> Layer<F> {
    pub fn is_foundation(&self) -> bool {
        self.low_contacts.is_empty()
    }
}

/// Reverses the decomposition order so layer 0 is at the bottom
/// (foundations), per spec.md §3 "LayerStructure".
pub(crate) struct LayerStructure<F> {
    pub layers: Vec<Layer<F>>,
    pub layer_of_node: Vec<LayerIndex>,
    pub reached_count: usize,
}

impl<F: Float> LayerStructure<F> {
    pub fn build(decomposition: LayerDecomposition<F>, reached_count: usize) -> Self {
        let LayerDecomposition {
            raw_layers,
            layer_of_node_raw,
        } = decomposition;
        let raw_count = raw_layers.len();
        let last = raw_count.saturating_sub(1);

        let mut layers: Vec<Layer<F>> = Vec::with_capacity(raw_count);
        let mut raw_layers = raw_layers;
        for raw in raw_layers.drain(..).rev() {
            // Every surviving low_contact points into the same lower layer
            // (the merge step above guarantees this by fusing any layer
            // that would otherwise bridge two distinct lower layers), so
            // the first one names it.
            let low_layer_id = raw.low_contacts.first().map(|c| {
                let other_raw_id =
                    layer_of_node_raw[c.other_node_id].expect("low-contact target must be placed");
                last - other_raw_id
            });
            layers.push(Layer {
                low_contacts: raw.low_contacts,
                cumulated_weight: raw.cumulated_weight,
                low_layer_id,
            });
        }

        let layer_of_node = layer_of_node_raw
            .into_iter()
            .map(|raw_id| raw_id.map(|id| last - id).unwrap_or(0))
            .collect();

        Self {
            layers,
            layer_of_node,
            reached_count,
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// A cluster: equal-depth, contact-connected nodes, without the layer
/// merge step (spec.md §4.5). Coarser than a single node, finer than a
/// layer.
pub(crate) struct Cluster<F> {
    pub nodes: Vec<NodeIndex>,
    pub low_contacts: Vec<LowerContact<F>>,
    pub cumulated_weight: F,
}

pub(crate) struct ClusterDecomposition<F> {
    pub clusters: Vec<Cluster<F>>,
}

impl<F: Float> ClusterDecomposition<F> {
    pub fn compute(f_structure: &F1Structure<F>, depth: &DepthDecomposition) -> Self {
        let n = depth.depth_of_node.len();
        let mut placed: Vec<bool> = vec![false; n];
        let mut clusters: Vec<Cluster<F>> = Vec::new();

        for depth_nodes in &depth.nodes_at_depth {
            for &root in depth_nodes {
                if placed[root] {
                    continue;
                }
                let mut nodes = Vec::new();
                let mut low_contacts = Vec::new();
                let mut cumulated_weight = F::zero();

                let mut stack = vec![root];
                placed[root] = true;
                while let Some(node_id) = stack.pop() {
                    nodes.push(node_id);
                    cumulated_weight = cumulated_weight + f_structure.weight(node_id);
                    let node_depth = depth.depth_of_node[node_id];

                    for contact in f_structure.contacts(node_id) {
                        let other = contact.other_node_id;
                        let other_depth = match depth.depth_of_node[other] {
                            Some(d) => d,
                            None => continue,
                        };
                        if Some(other_depth) == node_depth {
                            if !placed[other] {
                                placed[other] = true;
                                stack.push(other);
                            }
                        } else if node_depth.map_or(false, |d| other_depth < d) {
                            low_contacts.push(LowerContact {
                                upper_node_id: node_id,
                                other_node_id: other,
                                cond_plus: contact.cond_plus,
                                cond_minus: contact.cond_minus,
                            });
                        }
                    }
                }

                clusters.push(Cluster {
                    nodes,
                    low_contacts,
                    cumulated_weight,
                });
            }
        }

        Self { clusters }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Structure;
    use crate::stress::Stress;
    use crate::vector::NormalizedVec3;
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn three_block_column() -> (Arc<Structure<f64>>, F1Structure<f64>) {
        let mut structure = Structure::<f64>::new();
        let foundation = structure.add_node(10.0, true);
        let mid = structure.add_node(10.0, false);
        let top = structure.add_node(10.0, false);
        let up = NormalizedVec3::try_new(Vector3::new(0.0, 1.0, 0.0)).unwrap();
        structure
            .add_link(foundation, mid, up, Stress::new(1000.0, 1000.0, 1000.0))
            .unwrap();
        structure
            .add_link(mid, top, up, Stress::new(1000.0, 1000.0, 1000.0))
            .unwrap();
        let structure = Arc::new(structure);
        let f_structure =
            F1Structure::new(Arc::clone(&structure), Vector3::new(0.0, -10.0, 0.0)).unwrap();
        (structure, f_structure)
    }

    #[test]
    fn depth_decomposition_assigns_increasing_depth() {
        let (structure, f_structure) = three_block_column();
        let depth = DepthDecomposition::compute(&f_structure, &structure);
        assert_eq!(depth.depth_of_node, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(depth.reached_count, 3);
    }

    #[test]
    fn layer_structure_bottom_layer_is_foundation() {
        let (structure, f_structure) = three_block_column();
        let depth = DepthDecomposition::compute(&f_structure, &structure);
        let layer_decomp = LayerDecomposition::compute(&f_structure, &depth);
        let layer_structure = LayerStructure::build(layer_decomp, depth.reached_count);
        assert!(layer_structure.layers[0].is_foundation());
        assert_eq!(layer_structure.reached_count, 3);
    }

    #[test]
    fn cluster_decomposition_covers_every_reached_node() {
        let (structure, f_structure) = three_block_column();
        let depth = DepthDecomposition::compute(&f_structure, &structure);
        let clusters = ClusterDecomposition::compute(&f_structure, &depth);
        let total: usize = clusters.clusters.iter().map(|c| c.nodes.len()).sum();
        assert_eq!(total, depth.reached_count);
    }
}
