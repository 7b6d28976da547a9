use super::main::FrameStore;

/// z-stack 中的一層
#[derive(Debug)]
pub struct Layer {
    pub label: String,
    pub store: FrameStore,
}

/// 目前的預覽內容：單一序列，或多層 z-stack
///
/// 每個影格緩衝區只屬於一個 `FrameStore`，切換或替換時整個值一起移動。
#[derive(Debug)]
pub enum PreviewSet {
    Flat(FrameStore),
    Layered { layers: Vec<Layer>, active: usize },
}

impl Default for PreviewSet {
    fn default() -> Self {
        Self::Flat(FrameStore::default())
    }
}

impl PreviewSet {
    /// 建立多層預覽；沒有任何層時回傳 `None`
    #[must_use]
    pub fn layered(layers: Vec<Layer>) -> Option<Self> {
        if layers.is_empty() {
            return None;
        }
        Some(Self::Layered { layers, active: 0 })
    }

    #[must_use]
    pub fn active(&self) -> &FrameStore {
        match self {
            Self::Flat(store) => store,
            Self::Layered { layers, active } => &layers[*active].store,
        }
    }

    pub fn active_mut(&mut self) -> &mut FrameStore {
        match self {
            Self::Flat(store) => store,
            Self::Layered { layers, active } => &mut layers[*active].store,
        }
    }

    #[must_use]
    pub fn layer_count(&self) -> usize {
        match self {
            Self::Flat(_) => 1,
            Self::Layered { layers, .. } => layers.len(),
        }
    }

    #[must_use]
    pub fn active_layer(&self) -> usize {
        match self {
            Self::Flat(_) => 0,
            Self::Layered { active, .. } => *active,
        }
    }

    #[must_use]
    pub fn active_label(&self) -> Option<&str> {
        match self {
            Self::Flat(_) => None,
            Self::Layered { layers, active } => Some(layers[*active].label.as_str()),
        }
    }

    /// 切換到指定層，保留目前的影格位置（超出時夾到最後一格）
    pub fn set_active_layer(&mut self, layer: usize) -> bool {
        let Self::Layered { layers, active } = self else {
            return layer == 0;
        };
        if layer >= layers.len() {
            return false;
        }
        let position = layers[*active].store.current_index();
        *active = layer;
        layers[*active].store.set_current(position);
        true
    }

    /// 循環切換到下一層
    pub fn next_layer(&mut self) {
        let count = self.layer_count();
        let next = (self.active_layer() + 1) % count;
        self.set_active_layer(next);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Flat(store) => store.is_empty(),
            Self::Layered { layers, .. } => layers.iter().all(|layer| layer.store.is_empty()),
        }
    }

    /// 所有層的預覽像素總和
    #[must_use]
    pub fn resident_bytes(&self) -> usize {
        match self {
            Self::Flat(store) => store.resident_bytes(),
            Self::Layered { layers, .. } => {
                layers.iter().map(|layer| layer.store.resident_bytes()).sum()
            }
        }
    }
}
