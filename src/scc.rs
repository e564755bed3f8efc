//! Strongly connected components and reachability over adjacency lists.

/// Tarjan's algorithm, iterative.
///
/// Components are returned in reverse topological order: every edge leaving a
/// component points into a component listed earlier.
pub fn strongly_connected_components(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;

    let n = adjacency.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut components = Vec::new();
    let mut counter = 0;

    // (node, position of the next successor to visit)
    let mut call_stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        call_stack.push((root, 0));
        while let Some(top) = call_stack.last_mut() {
            let (v, pos) = *top;
            if pos == 0 && index[v] == UNVISITED {
                index[v] = counter;
                lowlink[v] = counter;
                counter += 1;
                stack.push(v);
                on_stack[v] = true;
            }
            if let Some(&w) = adjacency[v].get(pos) {
                top.1 += 1;
                if index[w] == UNVISITED {
                    call_stack.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            // All successors done.
            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                components.push(component);
            }
        }
    }
    components
}

/// Component number of every node, for the components returned above.
pub fn component_index(components: &[Vec<usize>], n: usize) -> Vec<usize> {
    let mut result = vec![0; n];
    for (c, component) in components.iter().enumerate() {
        for &v in component {
            result[v] = c;
        }
    }
    result
}

/// Nodes reachable from `start`.
pub fn reachable(adjacency: &[Vec<usize>], start: usize) -> Vec<bool> {
    let mut seen = vec![false; adjacency.len()];
    let mut stack = vec![start];
    seen[start] = true;
    while let Some(v) = stack.pop() {
        for &w in &adjacency[v] {
            if !seen[w] {
                seen[w] = true;
                stack.push(w);
            }
        }
    }
    seen
}

/// Nodes from which some node in `targets` is reachable.
pub fn coreachable(adjacency: &[Vec<usize>], targets: &[bool]) -> Vec<bool> {
    let n = adjacency.len();
    let mut reverse = vec![Vec::new(); n];
    for (v, succ) in adjacency.iter().enumerate() {
        for &w in succ {
            reverse[w].push(v);
        }
    }
    let mut seen = targets.to_vec();
    let mut stack: Vec<usize> = (0..n).filter(|&v| targets[v]).collect();
    while let Some(v) = stack.pop() {
        for &u in &reverse[v] {
            if !seen[u] {
                seen[u] = true;
                stack.push(u);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        // 0 -> 1 -> 2 -> 0, 2 -> 3, 3 -> 3, 4 isolated
        let adjacency = vec![vec![1], vec![2], vec![0, 3], vec![3], vec![]];
        let components = strongly_connected_components(&adjacency);
        assert_eq!(components, vec![vec![3], vec![0, 1, 2], vec![4]]);
        let index = component_index(&components, 5);
        assert_eq!(index, vec![1, 1, 1, 0, 2]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let n = 200_000;
        let adjacency: Vec<Vec<usize>> = (0..n).map(|i| if i + 1 < n { vec![i + 1] } else { vec![0] }).collect();
        let components = strongly_connected_components(&adjacency);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), n);
    }

    #[test]
    fn test_reachability() {
        let adjacency = vec![vec![1], vec![], vec![1]];
        assert_eq!(reachable(&adjacency, 0), vec![true, true, false]);
        assert_eq!(coreachable(&adjacency, &[false, true, false]), vec![true, true, true]);
        assert_eq!(coreachable(&adjacency, &[true, false, false]), vec![true, false, false]);
    }
}
